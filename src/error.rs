//! # Error Types
//!
//! Custom error types for the telemetry link using `thiserror`.

use thiserror::Error;

/// Main error type for the telemetry link
#[derive(Debug, Error)]
pub enum TelemetryLinkError {
    /// Frame checksum did not match the transmitted value
    #[error("Corrupt frame: checksum expected 0x{expected:04X}, received 0x{received:04X}")]
    CorruptFrame { expected: u16, received: u16 },

    /// Tag not in the protocol table, or its sentinel bytes did not confirm it
    #[error("Unknown frame type: 0x{0:02X}")]
    UnknownType(u8),

    /// Radio could not be initialized at start-up
    #[error("Radio hardware unavailable: {0}")]
    LinkHardwareUnavailable(String),

    /// Console request could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Serial transport errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry log serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the telemetry link
pub type Result<T> = std::result::Result<T, TelemetryLinkError>;
