//! Consumers of the live event stream.
//!
//! Each consumer subscribes to the event kinds it cares about when it
//! attaches and unsubscribes when it is detached (its `Subscription` guards
//! are dropped), keeping any derived state scoped to its own lifetime.

pub mod badges;
pub mod notifications;
