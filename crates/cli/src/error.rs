//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid command-line override
    #[error("Invalid value for --{flag}: {message}")]
    InvalidOverride { flag: &'static str, message: String },

    /// Relay execution error
    #[error("Relay execution failed: {message}")]
    RelayExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_override(flag: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            flag,
            message: message.into(),
        }
    }

    pub fn relay_execution(message: impl Into<String>) -> Self {
        Self::RelayExecution {
            message: message.into(),
        }
    }
}
