//! Command Dispatcher (spec §4.8): routes inbound commands to bus-side
//! actions and the Playback Engine, and builds the RESPONSE message sent
//! back to the caller.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::basenode::{MessageType, NodeMessage, Priority, Transport};
use crate::canbus::CanBus;
use crate::config::NodeConfig;
use crate::encode::{emergency_stop_frame, encode_j1939, encode_rudder, CanFrame};
use crate::error::CanControllerError;
use crate::fanout::SubscriberRegistry;
use crate::ingestion::IngestionLoop;
use crate::playback::PlaybackEngine;
use crate::reconciler::ConfigReconciler;
use crate::status::NodeStatus;

pub struct CommandDispatcher {
    bus: Arc<CanBus>,
    registry: Arc<SubscriberRegistry>,
    transport: Arc<dyn Transport>,
    playback: Arc<PlaybackEngine>,
    config: Arc<std::sync::RwLock<NodeConfig>>,
    ingestion: Arc<IngestionLoop>,
    reconciler: Arc<ConfigReconciler>,
}

impl CommandDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<CanBus>,
        registry: Arc<SubscriberRegistry>,
        transport: Arc<dyn Transport>,
        playback: Arc<PlaybackEngine>,
        config: Arc<std::sync::RwLock<NodeConfig>>,
        ingestion: Arc<IngestionLoop>,
        reconciler: Arc<ConfigReconciler>,
    ) -> Self {
        Self { bus, registry, transport, playback, config, ingestion, reconciler }
    }

    /// Dispatch one command and build its RESPONSE message (spec §4.8).
    /// `sender` becomes the response's destination.
    pub fn dispatch(&self, command: &str, payload: &Value, sender: &str) -> NodeMessage {
        let node_name = self.config.read().unwrap().transport.node_name.clone();
        match self.handle(command, payload) {
            Ok(message) => NodeMessage::new(
                MessageType::Response,
                Priority::Normal,
                &node_name,
                sender,
                json!({ "status": "success", "message": message }),
            ),
            Err(e) => NodeMessage::new(
                MessageType::Response,
                Priority::High,
                &node_name,
                sender,
                json!({ "status": "error", "error": e.to_string() }),
            ),
        }
    }

    fn handle(&self, command: &str, payload: &Value) -> crate::error::Result<String> {
        match command {
            "start_monitoring" => self.start_monitoring(),
            "stop_monitoring" => self.stop_monitoring(),
            "send_message" => self.send_message(payload),
            "send_j1939" => self.send_j1939(payload),
            "send_can_message" => self.send_can_message(payload),
            "subscribe_data" => self.subscribe_data(payload),
            "emergency_stop" => self.emergency_stop(payload),
            "play_can_file" => self.play_can_file(payload),
            "get_status" => self.get_status(),
            other => Err(CanControllerError::Command(format!("unknown command {other}"))),
        }
    }

    fn start_monitoring(&self) -> crate::error::Result<String> {
        if self.bus.state() == crate::canbus::BusState::Open {
            return Ok("already monitoring".to_string());
        }
        let config = self.config.read().unwrap();
        self.bus.open(&config.can_interface, &config.can_channel, config.can_bitrate)?;
        Ok("monitoring started".to_string())
    }

    fn stop_monitoring(&self) -> crate::error::Result<String> {
        self.bus.close();
        Ok("monitoring stopped".to_string())
    }

    fn get_status(&self) -> crate::error::Result<String> {
        let config = self.config.read().unwrap();
        let status = NodeStatus::snapshot(&config, &self.bus, &self.ingestion, &self.registry, &self.playback, &self.reconciler);
        serde_json::to_string(&status).map_err(|e| CanControllerError::Command(format!("failed to serialize status: {e}")))
    }

    fn send_message(&self, payload: &Value) -> crate::error::Result<String> {
        let can_data = payload
            .get("can_data")
            .ok_or_else(|| CanControllerError::Command("send_message missing can_data".to_string()))?;

        let arbitration_id = can_data
            .get("arbitration_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| CanControllerError::Command("send_message missing arbitration_id".to_string()))? as u32;

        let data: Vec<u8> = can_data
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| CanControllerError::Command("send_message missing data".to_string()))?
            .iter()
            .filter_map(Value::as_u64)
            .map(|b| b as u8)
            .collect();

        let is_extended_id = can_data.get("is_extended_id").and_then(Value::as_bool).unwrap_or(true);

        self.bus.send(&CanFrame { arbitration_id, is_extended_id, data })?;
        Ok("frame sent".to_string())
    }

    fn send_j1939(&self, payload: &Value) -> crate::error::Result<String> {
        let pgn = payload
            .get("pgn")
            .and_then(Value::as_u64)
            .ok_or_else(|| CanControllerError::Command("send_j1939 missing pgn".to_string()))? as u32;
        let source_address = payload
            .get("source_address")
            .and_then(Value::as_u64)
            .ok_or_else(|| CanControllerError::Command("send_j1939 missing source_address".to_string()))? as u8;
        let priority = payload.get("priority").and_then(Value::as_u64).unwrap_or(6) as u8;
        let data: Vec<u8> = payload
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| CanControllerError::Command("send_j1939 missing data".to_string()))?
            .iter()
            .filter_map(Value::as_u64)
            .map(|b| b as u8)
            .collect();

        let frame = encode_j1939(priority, pgn, source_address, &data);
        self.bus.send(&frame)?;
        Ok("j1939 frame sent".to_string())
    }

    fn send_can_message(&self, payload: &Value) -> crate::error::Result<String> {
        let pgn = payload.get("pgn").and_then(Value::as_u64).unwrap_or(0);
        if pgn != 127245 {
            return Err(CanControllerError::Command(format!("send_can_message only supports PGN 127245, got {pgn}")));
        }

        let data = payload
            .get("data")
            .ok_or_else(|| CanControllerError::Command("send_can_message missing data".to_string()))?;
        let instance = data.get("instance").and_then(Value::as_u64).unwrap_or(0) as u8;
        let position = data.get("position").and_then(Value::as_f64).unwrap_or(0.0);
        let direction_order = data.get("directionOrder").and_then(Value::as_u64).unwrap_or(0) as u8;
        let angle_order = data.get("angleOrder").and_then(Value::as_f64).unwrap_or(0.0);
        let source = self.config.read().unwrap().can_source_address;

        let frame = encode_rudder(instance, direction_order, angle_order, position, source)?;
        self.bus.send(&frame)?;
        Ok("rudder command sent".to_string())
    }

    fn subscribe_data(&self, payload: &Value) -> crate::error::Result<String> {
        let subscriber = payload
            .get("subscriber")
            .and_then(Value::as_str)
            .ok_or_else(|| CanControllerError::Command("subscribe_data missing subscriber".to_string()))?;
        self.registry.subscribe(subscriber);
        Ok(format!("{subscriber} subscribed"))
    }

    fn emergency_stop(&self, payload: &Value) -> crate::error::Result<String> {
        let source = payload.get("source").and_then(Value::as_str).unwrap_or("unknown");
        let frame = emergency_stop_frame();
        if let Err(e) = self.bus.send(&frame) {
            tracing::warn!(error = %e, "emergency bus send failed; still broadcasting to peers");
        }

        let node_name = self.config.read().unwrap().transport.node_name.clone();
        let emergency_nodes = self.config.read().unwrap().emergency_nodes.clone();
        for peer in &emergency_nodes {
            let message = NodeMessage::new(
                MessageType::Emergency,
                Priority::Emergency,
                &node_name,
                peer,
                json!({ "command": "emergency_stop", "source": source }),
            );
            if let Err(e) = self.transport.send_emergency(peer, &message) {
                tracing::warn!(peer, error = %e, "emergency broadcast failed for peer");
            }
        }
        Ok("emergency stop broadcast".to_string())
    }

    fn play_can_file(&self, payload: &Value) -> crate::error::Result<String> {
        if !self.config.read().unwrap().playback_enabled {
            return Err(CanControllerError::Command("playback is disabled".to_string()));
        }
        let file_path = payload
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| CanControllerError::Command("play_can_file missing file_path".to_string()))?;

        let started = self.playback.start(file_path, self.bus.clone())?;
        if started {
            Ok(format!("playback started for {file_path}"))
        } else {
            Ok("playback already running, ignored".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::sync::RwLock;

    fn dispatcher() -> CommandDispatcher {
        let bus = Arc::new(CanBus::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Arc::new(crate::basenode::UdpTransport::new(listener.local_addr().unwrap(), Default::default()).unwrap());
        let playback = Arc::new(PlaybackEngine::new());
        let config = Arc::new(RwLock::new(NodeConfig::default()));
        let ingestion_transport = Arc::new(crate::basenode::UdpTransport::new(listener.local_addr().unwrap(), Default::default()).unwrap());
        let ingestion = Arc::new(crate::ingestion::IngestionLoop::new(
            bus.clone(),
            registry.clone(),
            ingestion_transport,
            "test_node".to_string(),
            Arc::new(std::sync::atomic::AtomicI64::new(7)),
            Arc::new(std::sync::atomic::AtomicBool::new(true)),
        ));
        let reconciler = Arc::new(ConfigReconciler::new(bus.clone(), config.clone(), Arc::new(std::sync::atomic::AtomicI64::new(7))));
        CommandDispatcher::new(bus, registry, transport, playback, config, ingestion, reconciler)
    }

    #[test]
    fn get_status_reports_closed_bus_and_zero_subscribers() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("get_status", &json!({}), "master_core");
        assert_eq!(response.priority, Priority::Normal);
        let message = response.payload.get("message").and_then(Value::as_str).unwrap();
        let status: serde_json::Value = serde_json::from_str(message).unwrap();
        assert_eq!(status["bus_state"], "closed");
        assert_eq!(status["subscriber_count"], 0);
    }

    #[test]
    fn unknown_command_is_a_command_error() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("frobnicate", &json!({}), "master_core");
        assert_eq!(response.priority, Priority::High);
    }

    #[test]
    fn subscribe_data_adds_to_registry() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("subscribe_data", &json!({ "subscriber": "engine" }), "master_core");
        assert_eq!(response.priority, Priority::Normal);
        assert!(dispatcher.registry.contains("engine"));
    }

    #[test]
    fn send_can_message_rejects_non_rudder_pgn() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(
            "send_can_message",
            &json!({ "pgn": 127488, "data": { "instance": 0, "position": 0.0 } }),
            "master_core",
        );
        assert_eq!(response.priority, Priority::High);
    }

    #[test]
    fn send_can_message_fails_without_open_bus() {
        // Bus starts Closed; the encoder succeeds but the send itself errors.
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(
            "send_can_message",
            &json!({ "pgn": 127245, "data": { "instance": 0, "position": 0.08, "angleOrder": 0.2 } }),
            "master_core",
        );
        assert_eq!(response.priority, Priority::High);
    }

    #[test]
    fn emergency_stop_reaches_peers_even_when_bus_send_fails() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("emergency_stop", &json!({ "source": "autopilot" }), "master_core");
        // Bus isn't open in this unit test, so the bus send itself errors, but
        // the peer broadcast must still run and the command must still report
        // success rather than abort on the bus-send failure.
        assert_eq!(response.priority, Priority::Normal);
        let message = response.payload.get("message").and_then(Value::as_str).unwrap();
        assert_eq!(message, "emergency stop broadcast");
    }

    #[test]
    fn play_can_file_requires_file_path() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("play_can_file", &json!({}), "master_core");
        assert_eq!(response.priority, Priority::High);
    }
}
