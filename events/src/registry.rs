use crate::envelope::{EventEnvelope, EventKind};
use dashmap::DashMap;
use log::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// A consumer of dispatched envelopes.
///
/// Implementations must not assume any particular invocation order relative
/// to other subscribers of the same kind. A panic inside `on_event` is
/// caught and logged by the dispatcher; it never reaches sibling
/// subscribers or the transport.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, envelope: &EventEnvelope);
}

/// Adapter so a plain closure can be registered as a subscriber.
struct FnSubscriber<F>(F);

impl<F> EventSubscriber for FnSubscriber<F>
where
    F: Fn(&EventEnvelope) + Send + Sync,
{
    fn on_event(&self, envelope: &EventEnvelope) {
        (self.0)(envelope)
    }
}

/// Unique identifier for a registration (client-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Entry {
    id: SubscriptionId,
    subscriber: Arc<dyn EventSubscriber>,
}

/// Kind-keyed subscriber registry shared between the transport and consumers.
///
/// Entries are created lazily on first subscribe for a kind; a kind's set
/// may become empty, and the registry itself lives for the lifetime of the
/// client. Uniqueness is preserved by `Arc` identity: registering the same
/// subscriber for the same kind twice yields the existing registration, so
/// every subscriber sees a given envelope at most once.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: DashMap<EventKind, Vec<Entry>>,
}

impl Inner {
    fn remove(&self, kind: &EventKind, id: &SubscriptionId) {
        if let Some(mut entries) = self.subscribers.get_mut(kind) {
            entries.retain(|entry| entry.id != *id);
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for envelopes of `kind`.
    ///
    /// The returned guard removes exactly this registration when dropped or
    /// explicitly unsubscribed; other registrations for the same or other
    /// kinds are unaffected. Re-registering the same `Arc` for the same
    /// kind returns a guard for the existing registration instead of
    /// creating a second deliverable entry.
    pub fn subscribe(
        &self,
        kind: EventKind,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Subscription {
        let mut entries = self.inner.subscribers.entry(kind.clone()).or_default();

        let id = match entries
            .iter()
            .find(|entry| Arc::ptr_eq(&entry.subscriber, &subscriber))
        {
            Some(existing) => existing.id.clone(),
            None => {
                let id = SubscriptionId::new();
                entries.push(Entry {
                    id: id.clone(),
                    subscriber,
                });
                id
            }
        };

        drop(entries);

        Subscription {
            inner: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Register a closure for envelopes of `kind`.
    pub fn subscribe_fn<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(FnSubscriber(callback)))
    }

    /// Number of live registrations for `kind`.
    pub fn subscriber_count(&self, kind: &EventKind) -> usize {
        self.inner
            .subscribers
            .get(kind)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Deliver `envelope` to every subscriber currently registered for its kind.
    ///
    /// The subscriber list is snapshotted before delivery, so subscribers
    /// may subscribe or unsubscribe freely from inside their callbacks, and
    /// an unsubscription taking effect mid-dispatch never retracts an
    /// in-flight delivery. A panicking subscriber is logged and skipped;
    /// the remaining subscribers still receive the envelope.
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        let snapshot: Vec<Arc<dyn EventSubscriber>> =
            match self.inner.subscribers.get(&envelope.kind) {
                Some(entries) => entries
                    .iter()
                    .map(|entry| Arc::clone(&entry.subscriber))
                    .collect(),
                None => {
                    trace!("No subscribers for {} event", envelope.kind);
                    return;
                }
            };

        for subscriber in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(envelope)));

            if let Err(panic) = result {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());

                error!(
                    "Subscriber for {} event panicked: {}. Continuing with remaining subscribers.",
                    envelope.kind, reason
                );
            }
        }
    }
}

/// Guard for one registration in the registry.
///
/// Dropping the guard (or calling [`Subscription::unsubscribe`]) removes
/// the registration. Holding it is what keeps the subscriber attached, the
/// same way a consumer stays subscribed only while it is mounted.
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription {
    inner: Weak<Inner>,
    kind: EventKind,
    id: SubscriptionId,
}

impl Subscription {
    /// Remove this registration now. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove(&self.kind, &self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Counter(AtomicUsize);

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self(AtomicUsize::new(0)))
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl EventSubscriber for Counter {
        fn on_event(&self, _envelope: &EventEnvelope) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn envelope(kind: EventKind) -> EventEnvelope {
        EventEnvelope::with_data(kind, json!({}))
    }

    #[test]
    fn dispatch_reaches_exactly_the_current_subscribers() {
        let registry = SubscriptionRegistry::new();

        let messages = Counter::new();
        let emails = Counter::new();

        let _m = registry.subscribe(EventKind::MessageReceived, messages.clone());
        let _e = registry.subscribe(EventKind::EmailReceived, emails.clone());

        registry.dispatch(&envelope(EventKind::MessageReceived));
        registry.dispatch(&envelope(EventKind::MessageReceived));

        assert_eq!(messages.count(), 2);
        assert_eq!(emails.count(), 0);
    }

    #[test]
    fn unsubscribing_one_of_two_leaves_the_other_delivering() {
        let registry = SubscriptionRegistry::new();

        let first = Counter::new();
        let second = Counter::new();

        let sub_first = registry.subscribe(EventKind::MessageReceived, first.clone());
        let _sub_second = registry.subscribe(EventKind::MessageReceived, second.clone());

        registry.dispatch(&envelope(EventKind::MessageReceived));

        sub_first.unsubscribe();

        registry.dispatch(&envelope(EventKind::MessageReceived));

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 2);
        assert_eq!(registry.subscriber_count(&EventKind::MessageReceived), 1);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let registry = SubscriptionRegistry::new();
        let counter = Counter::new();

        {
            let _sub = registry.subscribe(EventKind::ReminderShared, counter.clone());
            registry.dispatch(&envelope(EventKind::ReminderShared));
        }

        registry.dispatch(&envelope(EventKind::ReminderShared));

        assert_eq!(counter.count(), 1);
        assert_eq!(registry.subscriber_count(&EventKind::ReminderShared), 0);
    }

    #[test]
    fn same_subscriber_registered_twice_delivers_once() {
        let registry = SubscriptionRegistry::new();
        let counter = Counter::new();

        let _a = registry.subscribe(EventKind::MessageReceived, counter.clone());
        let _b = registry.subscribe(EventKind::MessageReceived, counter.clone());

        assert_eq!(registry.subscriber_count(&EventKind::MessageReceived), 1);

        registry.dispatch(&envelope(EventKind::MessageReceived));

        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_block_the_spy_after_it() {
        let registry = SubscriptionRegistry::new();

        let _panicker = registry.subscribe_fn(EventKind::MessageReceived, |_| {
            panic!("subscriber blew up");
        });

        let spy = Counter::new();
        let _spy_sub = registry.subscribe(EventKind::MessageReceived, spy.clone());

        registry.dispatch(&envelope(EventKind::MessageReceived));
        registry.dispatch(&envelope(EventKind::MessageReceived));

        assert_eq!(spy.count(), 2);
        // Registry state survives the panic.
        assert_eq!(registry.subscriber_count(&EventKind::MessageReceived), 2);
    }

    #[test]
    fn unsubscribing_a_different_kind_mid_dispatch_leaves_current_delivery_intact() {
        let registry = SubscriptionRegistry::new();

        let reminder_counter = Counter::new();
        let reminder_sub = registry.subscribe(EventKind::ReminderShared, reminder_counter.clone());

        // First message subscriber tears down the reminder subscription while
        // a message envelope is being dispatched.
        let held: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(Some(reminder_sub)));
        let held_clone = held.clone();
        let _dropper = registry.subscribe_fn(EventKind::MessageReceived, move |_| {
            held_clone.lock().unwrap().take();
        });

        let message_counter = Counter::new();
        let _message_sub = registry.subscribe(EventKind::MessageReceived, message_counter.clone());

        registry.dispatch(&envelope(EventKind::MessageReceived));

        // The in-flight message dispatch reached all of its subscribers.
        assert_eq!(message_counter.count(), 1);
        // The reminder registration is gone for future dispatches.
        registry.dispatch(&envelope(EventKind::ReminderShared));
        assert_eq!(reminder_counter.count(), 0);
    }

    #[test]
    fn subscribing_from_inside_a_callback_does_not_deadlock() {
        let registry = SubscriptionRegistry::new();

        let late = Counter::new();
        let late_clone = late.clone();
        let registry_clone = registry.clone();
        let storage: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let storage_clone = storage.clone();

        let _sub = registry.subscribe_fn(EventKind::ConversationAssigned, move |_| {
            let sub = registry_clone.subscribe(EventKind::ConversationAssigned, late_clone.clone());
            storage_clone.lock().unwrap().push(sub);
        });

        // No replay: the subscriber added during this dispatch only sees the next one.
        registry.dispatch(&envelope(EventKind::ConversationAssigned));
        assert_eq!(late.count(), 0);

        registry.dispatch(&envelope(EventKind::ConversationAssigned));
        assert_eq!(late.count(), 1);
    }

    #[test]
    fn unknown_kinds_dispatch_generically() {
        let registry = SubscriptionRegistry::new();
        let counter = Counter::new();

        let kind = EventKind::Other("call-missed".to_string());
        let _sub = registry.subscribe(kind.clone(), counter.clone());

        registry.dispatch(&envelope(kind));

        assert_eq!(counter.count(), 1);
    }
}
