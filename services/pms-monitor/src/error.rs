//! Error types for the particulate monitor

/// Errors that can occur while acquiring, storing or displaying readings
#[derive(Debug, thiserror::Error)]
pub enum PmsError {
    #[error("Not connected to PMS5003")]
    NotConnected,

    #[error("Serial port error: {0}")]
    SerialPort(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] csv::Error),
}

impl PmsError {
    /// Whether the acquisition side should reopen the serial port after this error
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            PmsError::Timeout(_) | PmsError::Io(_) | PmsError::NotConnected
        )
    }
}

/// Result type alias for particulate monitor operations
pub type Result<T> = std::result::Result<T, PmsError>;
