//! Layered error definitions
//!
//! Categorized by source: config / transport / calibration / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Socket could not be bound
    #[error("transport bind error on '{addr}': {message}")]
    TransportBind { addr: String, message: String },

    /// Receive loop failure other than a deliberate shutdown
    #[error("transport '{source_name}' receive error: {message}")]
    TransportReceive {
        source_name: String,
        message: String,
    },

    // ===== Calibration Errors =====
    /// Neither a raw nor a displayed pose exists yet
    #[error("calibration has no basis pose: no sample has been reconstructed or applied")]
    CalibrationWithoutBasis,

    /// Multi-step calibration asked for zero steps or a non-positive interval
    #[error("invalid calibration schedule: {message}")]
    CalibrationSchedule { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport bind error
    pub fn transport_bind(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportBind {
            addr: addr.into(),
            message: message.into(),
        }
    }

    /// Create transport receive error
    pub fn transport_receive(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportReceive {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create calibration schedule error
    pub fn calibration_schedule(message: impl Into<String>) -> Self {
        Self::CalibrationSchedule {
            message: message.into(),
        }
    }
}
