//! Event system for the Converse real-time channel.
//!
//! This crate provides the pieces of the live event pipeline that have no
//! transport dependency:
//!
//! - **EventEnvelope**: the uniform wrapper every frame on the real-time
//!   channel carries (`type`, `timestamp`, `timezone`, `data`)
//! - **EventKind**: the catalog of known event tags, with a fallback
//!   variant so unknown tags still dispatch generically
//! - **SubscriptionRegistry**: kind-keyed registry of subscribers with
//!   per-subscriber panic isolation during dispatch
//!
//! The crate has no dependency on the transport (or on anything async), so
//! consumers and tests can exercise dispatch behavior without a socket.
//! Payload data is carried as `serde_json::Value`; its shape is a contract
//! between the backend and each individual consumer, not something the
//! pipeline validates.

pub mod envelope;
pub mod registry;

pub use envelope::{EventEnvelope, EventKind};
pub use registry::{EventSubscriber, Subscription, SubscriptionRegistry};
