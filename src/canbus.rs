//! CAN Bus Adapter (spec §4.5): open/recv/send/close over a platform CAN
//! binding, backed by `socketcan` on Linux. `recv` is exclusive to the
//! Ingestion Loop; `send` is shared across Main, Playback and the Command
//! Dispatcher behind its own mutex, so the two never contend on the same
//! lock (spec §8: "Ingestion never holds the bus-send mutex").

use std::sync::{Mutex, RwLock};
use std::time::Duration;

use socketcan::{CanFrame as SocketCanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame, Socket, StandardId};

use crate::encode::CanFrame;
use crate::error::{CanControllerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// The platform CAN handle plus the parameters it was opened with, so
/// `reopen_with_last_params` (used by the Config Reconciler's hot-restart)
/// doesn't need the caller to remember them.
struct OpenParams {
    interface: String,
    channel: String,
    bitrate: u32,
}

pub struct CanBus {
    state: RwLock<BusState>,
    socket: RwLock<Option<CanSocket>>,
    send_lock: Mutex<()>,
    last_params: Mutex<Option<OpenParams>>,
}

impl Default for CanBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CanBus {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BusState::Closed),
            socket: RwLock::new(None),
            send_lock: Mutex::new(()),
            last_params: Mutex::new(None),
        }
    }

    pub fn state(&self) -> BusState {
        *self.state.read().unwrap()
    }

    /// Open the interface at the given channel/bitrate. `interface` is the
    /// driver family (only `"socketcan"` is supported on this platform);
    /// `channel` is the device name (`"vcan0"`, `"can0"`, …).
    pub fn open(&self, interface: &str, channel: &str, bitrate: u32) -> Result<()> {
        *self.state.write().unwrap() = BusState::Opening;

        let opened = self.open_platform_socket(interface, channel, bitrate);
        match opened {
            Ok(socket) => {
                *self.socket.write().unwrap() = Some(socket);
                *self.state.write().unwrap() = BusState::Open;
                *self.last_params.lock().unwrap() = Some(OpenParams {
                    interface: interface.to_string(),
                    channel: channel.to_string(),
                    bitrate,
                });
                tracing::info!(interface, channel, bitrate, "CAN bus opened");
                Ok(())
            }
            Err(e) => {
                *self.state.write().unwrap() = BusState::Closed;
                Err(e)
            }
        }
    }

    #[cfg(unix)]
    fn open_platform_socket(&self, interface: &str, channel: &str, _bitrate: u32) -> Result<CanSocket> {
        if interface != "socketcan" {
            return Err(CanControllerError::BusOpen {
                interface: interface.to_string(),
                channel: channel.to_string(),
                reason: format!("interface family {interface} not supported on this platform"),
            });
        }
        CanSocket::open(channel).map_err(|e| CanControllerError::BusOpen {
            interface: interface.to_string(),
            channel: channel.to_string(),
            reason: e.to_string(),
        })
    }

    #[cfg(not(unix))]
    fn open_platform_socket(&self, interface: &str, channel: &str, _bitrate: u32) -> Result<CanSocket> {
        Err(CanControllerError::BusOpen {
            interface: interface.to_string(),
            channel: channel.to_string(),
            reason: "socketcan is only available on Unix-like platforms".to_string(),
        })
    }

    /// Reopen the interface with whatever parameters it was last opened
    /// with, used by the hot-restart path once the caller has updated
    /// `interface`/`channel`/`bitrate` in config.
    pub fn reopen(&self, interface: &str, channel: &str, bitrate: u32) -> Result<()> {
        self.open(interface, channel, bitrate)
    }

    pub fn close(&self) {
        *self.state.write().unwrap() = BusState::Closing;
        *self.socket.write().unwrap() = None;
        *self.state.write().unwrap() = BusState::Closed;
        tracing::info!("CAN bus closed");
    }

    /// Receive a single frame within `timeout`. Returns `Ok(None)` on a
    /// timeout with no frame, and a `BusRecvError` when the bus is not Open
    /// or the platform read itself fails.
    pub fn recv(&self, timeout: Duration) -> Result<Option<(u32, Vec<u8>, bool)>> {
        if self.state() != BusState::Open {
            return Err(CanControllerError::BusRecv("bus is not open".to_string()));
        }

        let guard = self.socket.read().unwrap();
        let socket = guard.as_ref().ok_or_else(|| CanControllerError::BusRecv("bus is not open".to_string()))?;

        socket
            .set_read_timeout(timeout)
            .map_err(|e| CanControllerError::BusRecv(e.to_string()))?;

        match socket.read_frame() {
            Ok(frame) => Ok(Some(decode_platform_frame(&frame))),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(CanControllerError::BusRecv(e.to_string())),
        }
    }

    /// Send a frame. Serialized across all callers (Main, Playback,
    /// emergency) via `send_lock`, never acquired by `recv`.
    pub fn send(&self, frame: &CanFrame) -> Result<()> {
        let _guard = self.send_lock.lock().unwrap();

        if self.state() != BusState::Open {
            return Err(CanControllerError::BusSend("bus is not open".to_string()));
        }

        let socket_guard = self.socket.read().unwrap();
        let socket = socket_guard.as_ref().ok_or_else(|| CanControllerError::BusSend("bus is not open".to_string()))?;

        let platform_frame = encode_platform_frame(frame)?;
        socket.write_frame(&platform_frame).map_err(|e| CanControllerError::BusSend(e.to_string()))
    }
}

fn decode_platform_frame(frame: &SocketCanFrame) -> (u32, Vec<u8>, bool) {
    let id = match frame.id() {
        socketcan::Id::Standard(id) => id.as_raw() as u32,
        socketcan::Id::Extended(id) => id.as_raw(),
    };
    (id, frame.data().to_vec(), frame.is_extended())
}

fn encode_platform_frame(frame: &CanFrame) -> Result<SocketCanFrame> {
    let id = if frame.is_extended_id {
        ExtendedId::new(frame.arbitration_id)
            .map(socketcan::Id::Extended)
            .ok_or_else(|| CanControllerError::BusSend(format!("arbitration id {:#x} exceeds 29 bits", frame.arbitration_id)))?
    } else {
        StandardId::new(frame.arbitration_id as u16)
            .map(socketcan::Id::Standard)
            .ok_or_else(|| CanControllerError::BusSend(format!("arbitration id {:#x} exceeds 11 bits", frame.arbitration_id)))?
    };

    SocketCanFrame::new(id, &frame.data).ok_or_else(|| CanControllerError::BusSend("frame data exceeds 8 bytes".to_string()))
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

/// Candidate interfaces for the Auto-Detect routine (spec §4.11), tried in
/// order after the `can_interface_1..4` config overrides.
pub fn platform_default_candidates() -> Vec<(&'static str, &'static str)> {
    if cfg!(windows) {
        vec![
            ("kvaser", "channel0"),
            ("pcan", "PCAN_USBBUS1"),
            ("vector", "channel0"),
            ("slcan", "COM3"),
            ("usb2can", "channel0"),
        ]
    } else {
        vec![("socketcan", "vcan0"), ("slcan", "/dev/ttyUSB0")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let bus = CanBus::new();
        assert_eq!(bus.state(), BusState::Closed);
    }

    #[test]
    fn recv_on_closed_bus_is_an_error_not_a_panic() {
        let bus = CanBus::new();
        let result = bus.recv(Duration::from_millis(10));
        assert!(result.is_err());
    }

    #[test]
    fn send_on_closed_bus_is_an_error_not_a_panic() {
        let bus = CanBus::new();
        let frame = crate::encode::emergency_stop_frame();
        assert!(bus.send(&frame).is_err());
    }

    #[test]
    fn open_with_unsupported_interface_family_fails_gracefully() {
        let bus = CanBus::new();
        let result = bus.open("kvaser", "channel0", 250000);
        assert!(result.is_err());
        assert_eq!(bus.state(), BusState::Closed);
    }
}
