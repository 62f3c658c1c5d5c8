//! Custom error types for the login guard
//!
//! This module defines the errors surfaced by the ban guard and its
//! configuration layer.

use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for ban guard operations
#[derive(Error, Debug)]
pub enum GuardError {
    /// The ban file could not be written
    #[error("Failed to persist ban state to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ban state could not be serialized
    #[error("Failed to serialize ban state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Invalid configuration value
    #[error("Guard configuration error: {0}")]
    Configuration(String),

    /// Configuration sources could not be read
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Type alias for Result with GuardError
pub type GuardResult<T> = Result<T, GuardError>;
