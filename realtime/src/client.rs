//! Public handle for the events channel.

use crate::endpoint::EventsEndpoint;
use crate::transport::{self, Command};
use crate::DEFAULT_RECONNECT_DELAY;
use events::{EventEnvelope, EventKind, EventSubscriber, Subscription, SubscriptionRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for one events client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: EventsEndpoint,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: EventsEndpoint) -> Self {
        Self {
            endpoint,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Override the reconnect delay. Intended for test tooling; production
    /// keeps the default.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// State shared between the transport task and the client handle.
///
/// This is the entire surface consumers may observe: the registry, the
/// connected flag, the last-seen display timezone, and the last error
/// message. The socket itself never leaves the transport task.
pub(crate) struct Shared {
    registry: SubscriptionRegistry,
    connected: AtomicBool,
    timezone: RwLock<Option<String>>,
    last_error: RwLock<Option<String>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            connected: AtomicBool::new(false),
            timezone: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    pub(crate) fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn set_timezone(&self, timezone: String) {
        *self.timezone.write().unwrap_or_else(|e| e.into_inner()) = Some(timezone);
    }

    pub(crate) fn timezone(&self) -> Option<String> {
        self.timezone
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.last_error.write().unwrap_or_else(|e| e.into_inner()) = Some(message);
    }

    pub(crate) fn clear_error(&self) {
        *self.last_error.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Handle to the single events connection of an authenticated session.
///
/// Cheap to clone; all clones drive the same connection. The transport
/// task stops when the last handle is dropped.
#[derive(Clone)]
pub struct EventsClient {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl EventsClient {
    /// Spawn the transport task and return its handle. Must be called from
    /// within a tokio runtime. No connection is attempted until a token is
    /// published via [`EventsClient::set_token`] or [`EventsClient::connect`].
    pub fn spawn(config: ClientConfig) -> Self {
        let shared = Arc::new(Shared::new());
        let (commands, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(transport::run(Arc::clone(&shared), config, command_rx));

        Self { shared, commands }
    }

    /// Register `subscriber` for envelopes of `kind`. See
    /// [`SubscriptionRegistry::subscribe`] for the delivery guarantees.
    pub fn subscribe(&self, kind: EventKind, subscriber: Arc<dyn EventSubscriber>) -> Subscription {
        self.shared.registry.subscribe(kind, subscriber)
    }

    /// The registry this client dispatches into, for consumers that manage
    /// several subscriptions at once.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.shared.registry
    }

    /// Register a closure for envelopes of `kind`.
    pub fn subscribe_fn<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe_fn(kind, callback)
    }

    /// Publish the session token. `Some` triggers a connect, `None` a
    /// disconnect; this is the normal way the channel follows login state.
    pub fn set_token(&self, token: Option<String>) {
        let _ = self.commands.send(Command::TokenChanged(token));
    }

    /// Ask for a connection. No-op while one is already open or underway,
    /// and while no token is published.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Tear the connection down and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Whether the channel is currently up.
    pub fn connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// The session's display timezone, as delivered by the most recent
    /// `connection-established` envelope.
    pub fn timezone(&self) -> Option<String> {
        self.shared.timezone()
    }

    /// Human-readable description of the most recent transport failure,
    /// cleared on the next successful open.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error()
    }
}
