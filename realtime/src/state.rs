//! Pure connection state machine for the events channel.
//!
//! The transport task feeds discrete events into [`transition`] and acts on
//! the state it gets back. Keeping the transitions free of I/O makes the
//! retry policy testable without sockets or timers.

/// Connection lifecycle states. Owned exclusively by the transport task;
/// consumers only ever observe the derived `connected` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectScheduled,
}

/// Discrete events that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket handshake completed.
    Open,
    /// The transport reported an error; the connection may still close.
    Error,
    /// The connection closed, for any reason other than a deliberate disconnect.
    Close,
    /// The reconnect delay elapsed.
    TimerFired,
    /// A consumer asked for a connection.
    ConnectRequested,
    /// A consumer asked for the connection to be torn down.
    DisconnectRequested,
}

/// The next state for `(state, event)`.
///
/// Unexpected combinations (a stale timer firing while disconnected, a
/// connect request while already connected) are no-ops rather than errors:
/// the channel's callers are UI-driven and may issue requests at any time.
pub fn transition(state: ConnectionState, event: ConnectionEvent) -> ConnectionState {
    use ConnectionEvent::*;
    use ConnectionState::*;

    match (state, event) {
        (Disconnected, ConnectRequested) => Connecting,
        (Disconnected, _) => Disconnected,

        (Connecting, Open) => Connected,
        (Connecting, Error) | (Connecting, Close) => ReconnectScheduled,
        (Connecting, DisconnectRequested) => Disconnected,
        (Connecting, _) => Connecting,

        // An error alone does not tear the connection down; a close event
        // follows if the transport gives up on the stream.
        (Connected, Error) => Connected,
        (Connected, Close) => ReconnectScheduled,
        (Connected, DisconnectRequested) => Disconnected,
        (Connected, _) => Connected,

        (ReconnectScheduled, TimerFired) => Connecting,
        (ReconnectScheduled, DisconnectRequested) => Disconnected,
        (ReconnectScheduled, _) => ReconnectScheduled,
    }
}
