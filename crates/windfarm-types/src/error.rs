//! Error types for the wind-farm analytics query layer.

use thiserror::Error;

/// Unified error type for configuration and domain parsing.
#[derive(Debug, Error)]
pub enum WindfarmError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
