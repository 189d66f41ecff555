//! Read-only node health snapshot (SPEC_FULL.md §G), grounded in the
//! original Python node's `get_can_status()`.

use serde::Serialize;

use crate::canbus::{BusState, CanBus};
use crate::config::NodeConfig;
use crate::fanout::SubscriberRegistry;
use crate::ingestion::{IngestionLoop, IngestionStatus};
use crate::playback::PlaybackEngine;
use crate::reconciler::ConfigReconciler;

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub can_interface: String,
    pub can_channel: String,
    pub bus_state: String,
    pub ingestion_status: String,
    pub subscriber_count: usize,
    pub emergency_stop_enabled: bool,
    pub playback_running: bool,
    pub degraded: bool,
}

impl NodeStatus {
    pub fn bus_state_label(state: BusState) -> &'static str {
        match state {
            BusState::Closed => "closed",
            BusState::Opening => "opening",
            BusState::Open => "open",
            BusState::Closing => "closing",
        }
    }

    fn ingestion_status_label(status: IngestionStatus) -> &'static str {
        match status {
            IngestionStatus::Running => "running",
            IngestionStatus::Error => "error",
        }
    }

    /// Assemble a live snapshot from the node's running state, the Rust
    /// equivalent of the Python original's `get_can_status()`.
    pub fn snapshot(
        config: &NodeConfig,
        bus: &CanBus,
        ingestion: &IngestionLoop,
        registry: &SubscriberRegistry,
        playback: &PlaybackEngine,
        reconciler: &ConfigReconciler,
    ) -> Self {
        Self {
            can_interface: config.can_interface.clone(),
            can_channel: config.can_channel.clone(),
            bus_state: Self::bus_state_label(bus.state()).to_string(),
            ingestion_status: Self::ingestion_status_label(ingestion.status()).to_string(),
            subscriber_count: registry.snapshot().len(),
            emergency_stop_enabled: !config.emergency_nodes.is_empty(),
            playback_running: playback.is_running(),
            degraded: reconciler.is_degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_state_label_matches_open() {
        assert_eq!(NodeStatus::bus_state_label(BusState::Open), "open");
    }

    #[test]
    fn snapshot_reflects_fresh_node_state() {
        use std::net::UdpSocket;
        use std::sync::atomic::{AtomicBool, AtomicI64};
        use std::sync::Arc;

        let config = NodeConfig::default();
        let bus = CanBus::new();
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Arc::new(crate::basenode::UdpTransport::new(listener.local_addr().unwrap(), Default::default()).unwrap());
        let registry = Arc::new(SubscriberRegistry::new());
        let ingestion = IngestionLoop::new(
            Arc::new(CanBus::new()),
            registry.clone(),
            transport,
            "test_node".to_string(),
            Arc::new(AtomicI64::new(7)),
            Arc::new(AtomicBool::new(true)),
        );
        let playback = PlaybackEngine::new();
        let reconciler = ConfigReconciler::new(Arc::new(CanBus::new()), Arc::new(std::sync::RwLock::new(config.clone())), Arc::new(AtomicI64::new(7)));

        let status = NodeStatus::snapshot(&config, &bus, &ingestion, &registry, &playback, &reconciler);
        assert_eq!(status.bus_state, "closed");
        assert_eq!(status.subscriber_count, 0);
        assert!(status.emergency_stop_enabled);
        assert!(!status.playback_running);
        assert!(!status.degraded);
    }
}
