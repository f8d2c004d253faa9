use events::{EventEnvelope, EventKind, EventSubscriber, Subscription, SubscriptionRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-channel unread counters, the way a header badge row consumes the
/// event stream. Counters grow on matching events and are reset explicitly
/// when the corresponding surface is viewed.
pub struct UnreadBadges {
    counters: Arc<Counters>,
    _subscriptions: Vec<Subscription>,
}

#[derive(Default)]
struct Counters {
    messages: AtomicU64,
    emails: AtomicU64,
    webchat_visitors: AtomicU64,
}

impl EventSubscriber for Counters {
    fn on_event(&self, envelope: &EventEnvelope) {
        match envelope.kind {
            EventKind::MessageReceived => {
                self.messages.fetch_add(1, Ordering::SeqCst);
            }
            EventKind::EmailReceived => {
                self.emails.fetch_add(1, Ordering::SeqCst);
            }
            EventKind::WebchatVisitorOnline => {
                self.webchat_visitors.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

impl UnreadBadges {
    pub fn attach(registry: &SubscriptionRegistry) -> Self {
        let counters = Arc::new(Counters::default());

        let subscriptions = [
            EventKind::MessageReceived,
            EventKind::EmailReceived,
            EventKind::WebchatVisitorOnline,
        ]
        .into_iter()
        .map(|kind| registry.subscribe(kind, Arc::clone(&counters) as Arc<dyn EventSubscriber>))
        .collect();

        Self {
            counters,
            _subscriptions: subscriptions,
        }
    }

    pub fn unread_messages(&self) -> u64 {
        self.counters.messages.load(Ordering::SeqCst)
    }

    pub fn unread_emails(&self) -> u64 {
        self.counters.emails.load(Ordering::SeqCst)
    }

    pub fn webchat_visitors(&self) -> u64 {
        self.counters.webchat_visitors.load(Ordering::SeqCst)
    }

    /// Reset the message counter, as when the inbox is opened.
    pub fn mark_messages_read(&self) {
        self.counters.messages.store(0, Ordering::SeqCst);
    }

    /// Reset the email counter, as when the email view is opened.
    pub fn mark_emails_read(&self) {
        self.counters.emails.store(0, Ordering::SeqCst);
    }

    /// Unsubscribe from the stream. Dropping the value does the same.
    pub fn detach(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(kind: EventKind) -> EventEnvelope {
        EventEnvelope::with_data(kind, json!({}))
    }

    #[test]
    fn counts_per_channel() {
        let registry = SubscriptionRegistry::new();
        let badges = UnreadBadges::attach(&registry);

        registry.dispatch(&envelope(EventKind::MessageReceived));
        registry.dispatch(&envelope(EventKind::MessageReceived));
        registry.dispatch(&envelope(EventKind::EmailReceived));
        registry.dispatch(&envelope(EventKind::WebchatVisitorOnline));
        // Kinds the badges do not subscribe to leave the counters alone.
        registry.dispatch(&envelope(EventKind::ReminderShared));

        assert_eq!(badges.unread_messages(), 2);
        assert_eq!(badges.unread_emails(), 1);
        assert_eq!(badges.webchat_visitors(), 1);
    }

    #[test]
    fn marking_read_resets_only_that_channel() {
        let registry = SubscriptionRegistry::new();
        let badges = UnreadBadges::attach(&registry);

        registry.dispatch(&envelope(EventKind::MessageReceived));
        registry.dispatch(&envelope(EventKind::EmailReceived));

        badges.mark_messages_read();

        assert_eq!(badges.unread_messages(), 0);
        assert_eq!(badges.unread_emails(), 1);
    }

    #[test]
    fn detaching_stops_counting() {
        let registry = SubscriptionRegistry::new();
        let badges = UnreadBadges::attach(&registry);

        registry.dispatch(&envelope(EventKind::MessageReceived));
        badges.detach();
        registry.dispatch(&envelope(EventKind::MessageReceived));

        assert_eq!(
            registry.subscriber_count(&EventKind::MessageReceived),
            0
        );
    }
}
