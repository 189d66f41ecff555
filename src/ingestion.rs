//! Ingestion Loop (spec §4.6): the worker that owns bus `recv`, decodes and
//! classifies each frame, and fans it out to subscribers and Master Core.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

use crate::basenode::{MessageType, NodeMessage, Priority, Transport};
use crate::canbus::CanBus;
use crate::category::Category;
use crate::decode::decode_frame;
use crate::fanout::SubscriberRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStatus {
    Running,
    Error,
}

const RECV_TIMEOUT: Duration = Duration::from_secs(1);
const CONSECUTIVE_ERROR_WINDOW: Duration = Duration::from_secs(5);
const CONSECUTIVE_ERROR_THRESHOLD: u32 = 3;

pub struct IngestionLoop {
    bus: Arc<CanBus>,
    registry: Arc<SubscriberRegistry>,
    transport: Arc<dyn Transport>,
    node_name: String,
    data_ttl_days: Arc<AtomicI64>,
    running: Arc<AtomicBool>,
    status: std::sync::Mutex<IngestionStatus>,
}

impl IngestionLoop {
    pub fn new(
        bus: Arc<CanBus>,
        registry: Arc<SubscriberRegistry>,
        transport: Arc<dyn Transport>,
        node_name: String,
        data_ttl_days: Arc<AtomicI64>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            bus,
            registry,
            transport,
            node_name,
            data_ttl_days,
            running,
            status: std::sync::Mutex::new(IngestionStatus::Running),
        }
    }

    pub fn status(&self) -> IngestionStatus {
        *self.status.lock().unwrap()
    }

    /// Blocking loop body; call from the dedicated Ingestion thread.
    pub fn run(&self) {
        let mut consecutive_errors = 0u32;
        let mut window_start = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            match self.bus.recv(RECV_TIMEOUT) {
                Ok(None) => continue,
                Ok(Some((id, data, _is_remote))) => {
                    consecutive_errors = 0;
                    *self.status.lock().unwrap() = IngestionStatus::Running;
                    self.process_frame(id, &data);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transient recv error");
                    if window_start.elapsed() > CONSECUTIVE_ERROR_WINDOW {
                        consecutive_errors = 0;
                        window_start = Instant::now();
                    }
                    consecutive_errors += 1;
                    if consecutive_errors >= CONSECUTIVE_ERROR_THRESHOLD {
                        *self.status.lock().unwrap() = IngestionStatus::Error;
                    }
                }
            }
        }
    }

    fn process_frame(&self, arbitration_id: u32, data: &[u8]) {
        let timestamp = Utc::now();
        let decoded = decode_frame(arbitration_id, data, timestamp);
        let category = Category::of_pgn(decoded.pgn);

        tracing::info!(pgn = decoded.pgn, source = decoded.source, category = %category, "received CAN frame");

        let message_data = json!({
            "arbitration_id": arbitration_id,
            "data": data,
            "bus_timestamp": timestamp.timestamp_millis(),
            "decoded": true,
            "pgn": decoded.pgn,
            "category": category.to_string(),
            "fields": decoded.fields,
        });

        self.registry.broadcast(self.transport.as_ref(), &self.node_name, message_data.clone());

        let data_message = NodeMessage::new(
            MessageType::Data,
            Priority::Normal,
            &self.node_name,
            "master_core",
            json!({ "can_message": message_data, "parsed_data": decoded.fields }),
        );
        if let Err(e) = self.transport.send_to_master_core(&data_message) {
            tracing::warn!(error = %e, "failed to forward frame to master core");
        }

        if category != Category::Unknown {
            let ttl_days = self.data_ttl_days.load(Ordering::SeqCst);
            let ttl_expiration = timestamp + ChronoDuration::days(ttl_days);
            let command_message = NodeMessage::new(
                MessageType::Command,
                Priority::Normal,
                &self.node_name,
                "master_core",
                json!({
                    "command": "store_can_data",
                    "collection": category.collection_name(),
                    "data": decoded.fields,
                    "ttl_expiration": ttl_expiration.to_rfc3339(),
                    "category": category.to_string(),
                }),
            );
            if let Err(e) = self.transport.send_to_master_core(&command_message) {
                tracing::warn!(error = %e, "failed to send store_can_data command");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::sync::atomic::AtomicI64;

    #[test]
    fn unknown_category_skips_store_command() {
        // Regression guard for the logic split in process_frame: Unknown
        // category must never reach the store_can_data branch.
        assert_eq!(Category::of_pgn(131071), Category::Unknown);
    }

    #[test]
    fn recv_on_unopened_bus_does_not_panic_the_loop() {
        let bus = Arc::new(CanBus::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Arc::new(crate::basenode::UdpTransport::new(listener.local_addr().unwrap(), Default::default()).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        let ttl = Arc::new(AtomicI64::new(7));

        let ingestion = IngestionLoop::new(bus, registry, transport, "test_node".to_string(), ttl, running.clone());
        let result = ingestion.bus.recv(Duration::from_millis(10));
        assert!(result.is_err());
        assert_eq!(ingestion.status(), IngestionStatus::Running);
    }
}
