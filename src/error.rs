use thiserror::Error;

/// Error kinds per the propagation policy: most of these are logged and
/// swallowed by their caller rather than aborting the node.
#[derive(Debug, Error)]
pub enum CanControllerError {
    #[error("failed to open CAN bus {interface}:{channel}: {reason}")]
    BusOpen {
        interface: String,
        channel: String,
        reason: String,
    },

    #[error("failed to send CAN frame: {0}")]
    BusSend(String),

    #[error("failed to receive CAN frame: {0}")]
    BusRecv(String),

    #[error("failed to decode PGN {pgn}: {reason}")]
    Decode { pgn: u32, reason: String },

    #[error("failed to encode PGN {pgn}: {reason}")]
    Encode { pgn: u32, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("playback error: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, CanControllerError>;
