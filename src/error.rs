use crate::stomp::FrameError;

/// Errors raised on the tracker (client) side of the bus.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid tracker endpoint: {0}")]
    Endpoint(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("handshake rejected: {0}")]
    Handshake(String),

    #[error("connection failed after {attempts} attempts: {reason}")]
    ConnectFailed { attempts: u32, reason: String },

    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("failed to decode message body: {0}")]
    Decode(String),

    #[error("not connected")]
    NotConnected,
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TrackerError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TrackerError::Transport(e.to_string())
    }
}
