use anyhow::Result;
use events::{EventEnvelope, EventKind, Subscription};
use log::*;
use realtime::{ClientConfig, EventsClient, EventsEndpoint};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Event kinds the tool records from each connection.
const WATCHED_KINDS: &[EventKind] = &[
    EventKind::ConnectionEstablished,
    EventKind::MessageSent,
    EventKind::MessageReceived,
    EventKind::EmailSent,
    EventKind::EmailReceived,
    EventKind::ConversationAssigned,
    EventKind::ReminderShared,
    EventKind::WebchatVisitorOnline,
];

pub struct Connection {
    pub user_label: String,
    client: EventsClient,
    event_rx: mpsc::UnboundedReceiver<EventEnvelope>,
    _subscriptions: Vec<Subscription>,
}

impl Connection {
    pub async fn establish(base_url: &str, token: &str, user_label: String) -> Result<Self> {
        let endpoint = EventsEndpoint::parse(base_url)?;
        let client = EventsClient::spawn(ClientConfig::new(endpoint));

        let (tx, rx) = mpsc::unbounded_channel();

        let subscriptions = WATCHED_KINDS
            .iter()
            .map(|kind| {
                let tx = tx.clone();
                let label = user_label.clone();
                client.subscribe_fn(kind.clone(), move |envelope| {
                    if tx.send(envelope.clone()).is_err() {
                        debug!("Event receiver dropped for {}", label);
                    }
                })
            })
            .collect();

        client.set_token(Some(token.to_string()));

        let connection = Self {
            user_label,
            client,
            event_rx: rx,
            _subscriptions: subscriptions,
        };

        connection.wait_until_connected(Duration::from_secs(5)).await?;

        Ok(connection)
    }

    async fn wait_until_connected(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        while !self.client.connected() {
            if Instant::now() >= deadline {
                match self.client.last_error() {
                    Some(error) => anyhow::bail!(
                        "Timeout connecting events channel for {}: {}",
                        self.user_label,
                        error
                    ),
                    None => anyhow::bail!(
                        "Timeout connecting events channel for {}",
                        self.user_label
                    ),
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Ok(())
    }

    pub fn connected(&self) -> bool {
        self.client.connected()
    }

    pub fn timezone(&self) -> Option<String> {
        self.client.timezone()
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    pub async fn wait_for_event(
        &mut self,
        kind: &EventKind,
        timeout: Duration,
    ) -> Result<EventEnvelope> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", kind);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(envelope)) if envelope.kind == *kind => {
                    return Ok(envelope);
                }
                Ok(Some(_)) => {
                    // Wrong event kind, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("Events connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", kind);
                }
            }
        }
    }
}
