//! BaseNode transport stand-in (SPEC_FULL.md §F). The real BaseNode framing,
//! retry and address-resolution behavior is out of scope (spec §1) — this is
//! the minimum viable JSON-over-UDP peer so Fan-Out, the Command Dispatcher
//! and the Heartbeat Scheduler have something concrete to send through,
//! grounded in the teacher's `UdpBroadcaster`.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{CanControllerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Data,
    Command,
    Response,
    Heartbeat,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Normal,
    High,
    Emergency,
}

/// The wire message shape spec §6 defines for BaseNode traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMessage {
    pub message_id: Uuid,
    pub message_type: MessageType,
    pub priority: Priority,
    pub source: String,
    pub destination: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl NodeMessage {
    pub fn new(message_type: MessageType, priority: Priority, source: &str, destination: &str, payload: Value) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            message_type,
            priority,
            source: source.to_string(),
            destination: destination.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// The send-side surface the rest of the node needs from BaseNode. Kept
/// narrow and synchronous, matching the teacher's `MessageHandler` trait
/// shape in `nmea2k::message_handler`.
pub trait Transport: Send + Sync {
    fn send_to_master_core(&self, message: &NodeMessage) -> Result<()>;
    fn send_to_peer(&self, peer: &str, message: &NodeMessage) -> Result<()>;
    fn send_emergency(&self, peer: &str, message: &NodeMessage) -> Result<()> {
        self.send_to_peer(peer, message)
    }
}

/// JSON-over-UDP `Transport`, grounded directly in the teacher's
/// `UdpBroadcaster`: one non-blocking socket behind a mutex, error counting
/// capped so a flaky peer doesn't flood the log.
pub struct UdpTransport {
    socket: UdpSocket,
    master_core_addr: SocketAddr,
    peer_addresses: std::collections::HashMap<String, SocketAddr>,
    error_count: Mutex<u64>,
}

const MAX_LOGGED_ERRORS: u64 = 10;

impl UdpTransport {
    pub fn new(master_core_addr: SocketAddr, peer_addresses: std::collections::HashMap<String, SocketAddr>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            master_core_addr,
            peer_addresses,
            error_count: Mutex::new(0),
        })
    }

    fn send_json(&self, addr: SocketAddr, message: &NodeMessage) -> Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| CanControllerError::Command(format!("failed to serialize node message: {e}")))?;

        match self.socket.send_to(json.as_bytes(), addr) {
            Ok(_) => Ok(()),
            Err(e) => {
                let mut count = self.error_count.lock().unwrap();
                if *count < MAX_LOGGED_ERRORS {
                    tracing::warn!(%addr, error = %e, "failed to send node message over UDP");
                }
                *count += 1;
                Err(CanControllerError::Command(format!("UDP send to {addr} failed: {e}")))
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send_to_master_core(&self, message: &NodeMessage) -> Result<()> {
        self.send_json(self.master_core_addr, message)
    }

    fn send_to_peer(&self, peer: &str, message: &NodeMessage) -> Result<()> {
        let addr = self
            .peer_addresses
            .get(peer)
            .ok_or_else(|| CanControllerError::Command(format!("unknown peer {peer}")))?;
        self.send_json(*addr, message)
    }
}

/// A bound, blocking-with-timeout socket the Main thread's BaseNode receive
/// loop polls for inbound `NodeMessage`s (spec §5: "Main — owns the BaseNode
/// UDP receive loop").
pub struct InboundListener {
    socket: UdpSocket,
}

impl InboundListener {
    pub fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(std::time::Duration::from_secs(1)))?;
        Ok(Self { socket })
    }

    /// Poll for one inbound message, returning `Ok(None)` on a read timeout.
    pub fn recv(&self) -> Result<Option<(NodeMessage, SocketAddr)>> {
        let mut buf = [0u8; 4096];
        match self.socket.recv_from(&mut buf) {
            Ok((len, addr)) => {
                let message: NodeMessage = serde_json::from_slice(&buf[..len])
                    .map_err(|e| CanControllerError::Command(format!("malformed inbound message: {e}")))?;
                Ok(Some((message, addr)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(CanControllerError::Command(format!("inbound recv failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_peer_is_an_error_not_a_panic() {
        let transport = UdpTransport::new("127.0.0.1:10110".parse().unwrap(), Default::default()).unwrap();
        let msg = NodeMessage::new(MessageType::Heartbeat, Priority::Normal, "node", "peer", serde_json::json!({}));
        assert!(transport.send_to_peer("nonexistent", &msg).is_err());
    }

    #[test]
    fn send_to_master_core_succeeds_against_a_bound_loopback_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = UdpTransport::new(addr, Default::default()).unwrap();
        let msg = NodeMessage::new(MessageType::Data, Priority::Normal, "node", "master_core", serde_json::json!({"ok": true}));
        assert!(transport.send_to_master_core(&msg).is_ok());
    }
}
