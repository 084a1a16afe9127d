//! Error types and handling
//!
//! Common error types used across the recorder.

use crate::recorder::state::RecordingState;
use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum LoggerError {
    /// No supported location provider exists on this device
    #[error("No supported location provider available")]
    Unavailable,

    /// Location permission is missing or was revoked
    #[error("Location permission not granted")]
    Unauthorized,

    /// The output sink could not be created or opened
    #[error("Failed to open output: {0}")]
    OpenFailure(String),

    /// A scoped URI could not be resolved to a writable descriptor
    #[error("Failed to resolve output URI: {0}")]
    ResolutionFailure(String),

    /// The operation needs an enabled (listening) session
    #[error("Session is not listening (state: {0:?})")]
    NotListening(RecordingState),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoggerError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            LoggerError::Unavailable => "UNAVAILABLE",
            LoggerError::Unauthorized => "UNAUTHORIZED",
            LoggerError::OpenFailure(_) => "OPEN_FAILURE",
            LoggerError::ResolutionFailure(_) => "RESOLUTION_FAILURE",
            LoggerError::NotListening(_) => "NOT_LISTENING",
            LoggerError::Io(_) => "IO_ERROR",
            LoggerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type alias using LoggerError
pub type LoggerResult<T> = Result<T, LoggerError>;
