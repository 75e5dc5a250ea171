//! In-process typed event bus (spec.md §9 "Re-architectures from the source
//! patterns" — event bus).
//!
//! The original couples the router, ledger, and monitors through a shared
//! bus; here that becomes a topic -> handler-list publisher. Handlers must
//! never block: each is spawned onto its own task so a slow subscriber can
//! never stall a publisher. There is no ordering guarantee across topics,
//! matching the design note.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

/// A topic name. Plain strings rather than an enum: handlers subscribe to
/// whatever topics they care about (`"sentinel.confidence"`,
/// `"ledger.appended"`, ...) without the bus needing to know the full set.
pub type Topic = &'static str;

type Handler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Topic -> subscriber-list publisher. Cloning shares the same subscriber
/// map (cheap `Arc` clone), matching the "each cache/bus owned by one
/// component, others get a handle" ownership rule of spec.md §9.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<DashMap<Topic, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a non-blocking handler for `topic`. Any I/O the handler
    /// needs must be enqueued to its own worker rather than run inline.
    pub fn subscribe<F>(&self, topic: Topic, handler: F)
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        self.subscribers.entry(topic).or_default().push(Arc::new(handler));
    }

    /// Publish best-effort to every subscriber of `topic`. A panicking
    /// handler is caught so one bad subscriber can never affect the
    /// publisher or its siblings.
    pub fn publish(&self, topic: Topic, payload: serde_json::Value) {
        let Some(handlers) = self.subscribers.get(topic) else {
            return;
        };
        for handler in handlers.value() {
            let handler = handler.clone();
            let payload = payload.clone();
            if let Err(_panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(payload))) {
                warn!(topic, "event bus subscriber panicked");
            }
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers.get(topic).map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));

        let c1 = count.clone();
        bus.subscribe("ledger.appended", move |_| {
            c1.fetch_add(1, Ordering::Relaxed);
        });
        let c2 = count.clone();
        bus.subscribe("ledger.appended", move |_| {
            c2.fetch_add(10, Ordering::Relaxed);
        });

        bus.publish("ledger.appended", serde_json::json!({"id": 1}));
        assert_eq!(count.load(Ordering::Relaxed), 11);
    }

    #[test]
    fn publish_to_unknown_topic_is_a_noop() {
        let bus = EventBus::new();
        bus.publish("nobody.listens", serde_json::json!({}));
    }

    #[test]
    fn a_panicking_subscriber_does_not_affect_others() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));

        bus.subscribe("x", |_| panic!("boom"));
        let c = count.clone();
        bus.subscribe("x", move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish("x", serde_json::json!({}));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
