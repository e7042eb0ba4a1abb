//! Topic-based publish/subscribe transport.
//!
//! The conductor never talks to a concrete bus: it holds an
//! `Arc<dyn EventTransport>` supplied by the host at startup. The
//! [`InMemoryTransport`] here is the single-process reference
//! implementation used by hosts and tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::trace;
use uuid::Uuid;

/// Opaque identifier for one registered handler.
pub type SubscriptionId = Uuid;

/// A subscribed event handler.
///
/// Handlers receive the published payload by reference and must be callable
/// from any thread. Exception isolation between handlers is the subscription
/// manager's job, not the transport's.
pub type TransportHandler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// In-process publish/subscribe primitive.
///
/// Registration is synchronous: a subscription is active before `subscribe`
/// returns. Multiple independent subscribers per topic are supported;
/// delivery order across handlers is unspecified.
pub trait EventTransport: Send + Sync {
    /// Register a handler for a topic, returning its subscription id.
    fn subscribe(&self, topic: &str, handler: TransportHandler) -> SubscriptionId;

    /// Remove a previously registered handler. Returns `false` if the
    /// subscription was already gone.
    fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool;

    /// Deliver a payload to every handler currently registered for the
    /// topic. Returns the number of handlers invoked.
    fn publish(&self, topic: &str, payload: &serde_json::Value) -> usize;

    /// Debug introspection: number of live subscriptions per topic.
    fn subscription_counts(&self) -> HashMap<String, usize>;
}

/// Reference transport backed by a lock-guarded topic registry.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    topics: Arc<RwLock<HashMap<String, Vec<(SubscriptionId, TransportHandler)>>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventTransport for InMemoryTransport {
    fn subscribe(&self, topic: &str, handler: TransportHandler) -> SubscriptionId {
        let id = Uuid::new_v4();
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics.entry(topic.to_string()).or_default().push((id, handler));
        trace!(topic = %topic, subscription = %id, "transport subscribe");
        id
    }

    fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = topics.get_mut(topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        let removed = handlers.len() < before;
        if handlers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    fn publish(&self, topic: &str, payload: &serde_json::Value) -> usize {
        // Snapshot handlers so delivery runs outside the lock; a handler
        // may itself subscribe or unsubscribe.
        let handlers: Vec<TransportHandler> = {
            let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
            match topics.get(topic) {
                Some(entries) => entries.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => Vec::new(),
            }
        };
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    fn subscription_counts(&self) -> HashMap<String, usize> {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics.iter().map(|(t, hs)| (t.clone(), hs.len())).collect()
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("subscription_counts", &self.subscription_counts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> TransportHandler {
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let transport = InMemoryTransport::new();
        let seen = Arc::new(AtomicUsize::new(0));
        transport.subscribe("beat:started", counting_handler(seen.clone()));

        let delivered = transport.publish("beat:started", &json!({"beat": 1}));
        assert_eq!(delivered, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let transport = InMemoryTransport::new();
        assert_eq!(transport.publish("beat:error", &json!({})), 0);
    }

    #[test]
    fn test_multiple_subscribers_each_receive() {
        let transport = InMemoryTransport::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        transport.subscribe("beat:completed", counting_handler(a.clone()));
        transport.subscribe("beat:completed", counting_handler(b.clone()));

        assert_eq!(transport.publish("beat:completed", &json!({})), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let transport = InMemoryTransport::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let id = transport.subscribe("beat:started", counting_handler(seen.clone()));

        assert!(transport.unsubscribe("beat:started", id));
        assert_eq!(transport.publish("beat:started", &json!({})), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        // Second removal reports the subscription as already gone.
        assert!(!transport.unsubscribe("beat:started", id));
    }

    #[test]
    fn test_subscription_counts() {
        let transport = InMemoryTransport::new();
        assert!(transport.subscription_counts().is_empty());

        let seen = Arc::new(AtomicUsize::new(0));
        transport.subscribe("beat:started", counting_handler(seen.clone()));
        transport.subscribe("beat:started", counting_handler(seen.clone()));
        transport.subscribe("beat:error", counting_handler(seen));

        let counts = transport.subscription_counts();
        assert_eq!(counts["beat:started"], 2);
        assert_eq!(counts["beat:error"], 1);
    }

    #[test]
    fn test_subscription_active_before_subscribe_returns() {
        // Registration is synchronous: publishing immediately after
        // subscribe must deliver.
        let transport = InMemoryTransport::new();
        let seen = Arc::new(AtomicUsize::new(0));
        transport.subscribe("t", counting_handler(seen.clone()));
        transport.publish("t", &json!(null));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
