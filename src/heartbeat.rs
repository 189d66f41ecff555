//! Heartbeat Scheduler (spec §4.10): emits a liveness signal to Master Core
//! every 10 seconds (±1s tolerance) until stopped, ticking on a 1-second
//! suspension point per spec §5 so `stop()` is observed within that bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::basenode::{MessageType, NodeMessage, Priority, Transport};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct HeartbeatScheduler {
    transport: Arc<dyn Transport>,
    node_name: String,
    running: Arc<AtomicBool>,
}

impl HeartbeatScheduler {
    pub fn new(transport: Arc<dyn Transport>, node_name: String, running: Arc<AtomicBool>) -> Self {
        Self { transport, node_name, running }
    }

    pub fn run(&self) {
        let mut last_beat = Instant::now() - HEARTBEAT_INTERVAL;

        while self.running.load(Ordering::SeqCst) {
            if last_beat.elapsed() >= HEARTBEAT_INTERVAL {
                self.send_heartbeat();
                last_beat = Instant::now();
            }
            std::thread::sleep(TICK_INTERVAL);
        }
    }

    fn send_heartbeat(&self) {
        let message = NodeMessage::new(
            MessageType::Heartbeat,
            Priority::Normal,
            &self.node_name,
            "master_core",
            json!({ "status": "alive" }),
        );
        if let Err(e) = self.transport.send_to_master_core(&message) {
            tracing::warn!(error = %e, "heartbeat send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    #[test]
    fn stops_promptly_once_running_flag_clears() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Arc::new(crate::basenode::UdpTransport::new(listener.local_addr().unwrap(), Default::default()).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        let scheduler = HeartbeatScheduler::new(transport, "test_node".to_string(), running.clone());

        let handle = std::thread::spawn(move || scheduler.run());
        std::thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::SeqCst);

        let start = Instant::now();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
