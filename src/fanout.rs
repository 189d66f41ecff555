//! Fan-Out / Subscriber Registry (spec §4.7). Insertion-only set of peer
//! names, written by the Command Dispatcher (Main thread) and read by the
//! Ingestion Loop on every decoded frame. An `RwLock` gives Fan-Out a
//! never-torn snapshot per spec §5's subscriber-registry requirement.

use std::collections::HashSet;
use std::sync::RwLock;

use serde_json::Value;

use crate::basenode::{MessageType, NodeMessage, Priority, Transport};

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashSet<String>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber if absent. No-op if already subscribed.
    pub fn subscribe(&self, name: &str) {
        self.subscribers.write().unwrap().insert(name.to_string());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.subscribers.read().unwrap().iter().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subscribers.read().unwrap().contains(name)
    }

    /// Best-effort delivery of `payload` to every subscribed peer. A failed
    /// delivery to one peer is logged but never aborts delivery to the rest.
    pub fn broadcast(&self, transport: &dyn Transport, node_name: &str, payload: Value) {
        for peer in self.snapshot() {
            let message = NodeMessage::new(MessageType::Data, Priority::Normal, node_name, &peer, payload.clone());
            if let Err(e) = transport.send_to_peer(&peer, &message) {
                tracing::warn!(peer, error = %e, "fan-out delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let registry = SubscriberRegistry::new();
        registry.subscribe("engine");
        registry.subscribe("engine");
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn contains_reflects_subscriptions() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.contains("autopilot"));
        registry.subscribe("autopilot");
        assert!(registry.contains("autopilot"));
    }
}
