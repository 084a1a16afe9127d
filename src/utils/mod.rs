//! Shared utilities
//!
//! Error types and recorder configuration.

pub mod config;
pub mod error;

pub use config::RecorderConfig;
pub use error::{LoggerError, LoggerResult};
