// Common types for the telemetry client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur during a telemetry session
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Lifecycle state of the transport connection
///
/// Exactly one value is active at any time; transitions are owned by the
/// `ConnectionManager` and cycle `Disconnected -> Connecting -> Connected ->
/// Disconnected -> ...` until explicit shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// Counters for a streaming session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub samples_received: u64,
    pub batches_pushed: u64,
}
