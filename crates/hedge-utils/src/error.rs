//! Error types for hedge-utils

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtilsError {
    /// Bad value in the environment or config
    #[error("Configuration error: {0}")]
    Config(String),

    /// Log filter directive could not be parsed
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// A global subscriber was already installed
    #[error("Tracing already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type Result<T> = std::result::Result<T, UtilsError>;
