//! Error types for the port filter

use thiserror::Error;

/// Why a header failed to decode.
///
/// Decode errors never leave the classifier: every variant resolves to
/// [`Action::Pass`](crate::Action::Pass).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the header format requires
    #[error("truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the read required
        needed: usize,
        /// Bytes left before the validated end
        remaining: usize,
    },

    /// Bytes are present but violate a structural invariant
    #[error("malformed: {0}")]
    Malformed(MalformedReason),
}

/// Structural invariant a header violated
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// IPv4 IHL below the 5-word minimum
    #[error("IPv4 IHL {0} is below the minimum of 5")]
    IhlTooSmall(u8),
}

/// Filter engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine already running")]
    AlreadyRunning,

    #[error("engine not running")]
    NotRunning,

    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("frame queue closed")]
    QueueClosed,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Value out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for header decoding
pub type DecodeResult<T> = Result<T, DecodeError>;
