use chrono::Utc;
use events::{EventEnvelope, EventKind, EventSubscriber, Subscription, SubscriptionRegistry};
use log::info;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One rendered entry in the notification feed.
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: EventKind,
    pub summary: String,
    /// Wall-clock time rendered in the event's display timezone when the
    /// envelope carried one.
    pub displayed_at: String,
}

/// Toast-style consumer: renders each matching event as a log line and
/// retains a bounded list of recent notifications.
pub struct NotificationFeed {
    inner: Arc<FeedInner>,
    _subscriptions: Vec<Subscription>,
}

struct FeedInner {
    limit: usize,
    recent: Mutex<VecDeque<Notification>>,
    seen: AtomicU64,
}

impl EventSubscriber for FeedInner {
    fn on_event(&self, envelope: &EventEnvelope) {
        let notification = Notification {
            kind: envelope.kind.clone(),
            summary: summarize(envelope),
            displayed_at: displayed_at(envelope),
        };

        info!(
            "[{}] {} ({})",
            notification.displayed_at, notification.summary, notification.kind
        );

        self.seen.fetch_add(1, Ordering::SeqCst);

        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        if recent.len() == self.limit {
            recent.pop_front();
        }
        recent.push_back(notification);
    }
}

impl NotificationFeed {
    pub fn attach(registry: &SubscriptionRegistry, limit: usize) -> Self {
        let inner = Arc::new(FeedInner {
            limit: limit.max(1),
            recent: Mutex::new(VecDeque::new()),
            seen: AtomicU64::new(0),
        });

        let subscriptions = [
            EventKind::MessageReceived,
            EventKind::EmailReceived,
            EventKind::ConversationAssigned,
            EventKind::ReminderShared,
        ]
        .into_iter()
        .map(|kind| registry.subscribe(kind, Arc::clone(&inner) as Arc<dyn EventSubscriber>))
        .collect();

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    /// The retained notifications, oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.inner
            .recent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Total notifications seen since attach, including evicted ones.
    pub fn seen(&self) -> u64 {
        self.inner.seen.load(Ordering::SeqCst)
    }

    /// Unsubscribe from the stream. Dropping the value does the same.
    pub fn detach(self) {}
}

/// Best-effort one-line summary from the payload fields each kind carries.
fn summarize(envelope: &EventEnvelope) -> String {
    let data = &envelope.data;

    match &envelope.kind {
        EventKind::MessageReceived => format!(
            "New message in conversation {}",
            data["conversation_id"].as_str().unwrap_or("(unknown)")
        ),
        EventKind::EmailReceived => format!(
            "New email from {}",
            data["from"].as_str().unwrap_or("(unknown sender)")
        ),
        EventKind::ConversationAssigned => format!(
            "Conversation {} assigned to {}",
            data["conversation_id"].as_str().unwrap_or("(unknown)"),
            data["assignee"].as_str().unwrap_or("you")
        ),
        EventKind::ReminderShared => format!(
            "Reminder shared: {}",
            data["title"].as_str().unwrap_or("(untitled)")
        ),
        other => format!("{other} event"),
    }
}

/// Render the envelope timestamp in its display timezone, falling back to
/// the local receive time when either is missing or malformed.
fn displayed_at(envelope: &EventEnvelope) -> String {
    match (envelope.parsed_timestamp(), envelope.display_timezone()) {
        (Some(timestamp), Some(timezone)) => timestamp
            .with_timezone(&timezone)
            .format("%H:%M:%S")
            .to_string(),
        (Some(timestamp), None) => timestamp.format("%H:%M:%S").to_string(),
        (None, _) => Utc::now().format("%H:%M:%S").to_string(),
    }
}
