//! WebSocket event transport for the Converse real-time channel.
//!
//! This crate maintains exactly one live connection per authenticated
//! session to the backend's `/events/connect` endpoint and recovers
//! automatically from drops.
//!
//! # Architecture
//!
//! - **Single connection per session**: one transport task owns the socket
//!   and the connection state machine; nothing else may open a second
//!   connection.
//! - **Explicit state machine**: `Disconnected`, `Connecting`, `Connected`,
//!   and `ReconnectScheduled`, driven by discrete events (`Open`, `Error`,
//!   `Close`, `TimerFired`, connect/disconnect requests). The transition
//!   function is pure and tested without any I/O.
//! - **Fixed-delay reconnect**: a dropped connection schedules exactly one
//!   retry after a fixed delay (3 seconds by default), unbounded attempts,
//!   no backoff growth. The only expected failure causes are transient
//!   network drops and backend restarts.
//! - **Token-driven lifecycle**: a bearer token becoming available triggers
//!   a connect; the token disappearing triggers a disconnect. Token absence
//!   is not an error, it simply means no connection is attempted.
//! - **Contained failures**: dial errors, stream errors, and malformed
//!   frames are logged and recorded as a human-readable last-error string.
//!   Nothing in this crate propagates a connection failure as an error to
//!   subscribers.
//!
//! # Message flow
//!
//! 1. The session store publishes a bearer token
//! 2. The transport dials `ws(s)://host/events/connect?token=<bearer>`,
//!    mirroring the scheme of the configured REST base URL
//! 3. Each JSON text frame is deserialized into an
//!    [`events::EventEnvelope`] and handed to the subscription registry
//! 4. The first `connection-established` envelope's timezone is cached for
//!    display use, then the envelope is dispatched like any other
//! 5. On close, a reconnect fires after the fixed delay unless the
//!    disconnect was deliberate
//!
//! # Modules
//!
//! - `state`: pure connection state machine
//! - `endpoint`: derivation of the events URL from the REST base URL
//! - `transport`: the tokio task driving the socket
//! - `client`: the public handle (`EventsClient`)
//! - `error`: layer error type

pub mod client;
pub mod endpoint;
pub mod error;
pub mod state;
pub mod transport;

pub use client::{ClientConfig, EventsClient};
pub use endpoint::EventsEndpoint;
pub use error::{Error, ErrorKind};
pub use state::{ConnectionEvent, ConnectionState};

/// Delay between a connection dropping and the reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(3);
