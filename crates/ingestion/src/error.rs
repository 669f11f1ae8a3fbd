//! Ingestion error types

use contracts::SampleDefect;
use thiserror::Error;

/// Why a datagram did not become a `PoseSample`
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Payload is not a valid JSON record
    #[error("malformed JSON record: {message}")]
    MalformedJson { message: String },

    /// Payload is not a valid binary record
    #[error("malformed binary record: {message}")]
    MalformedBinary { message: String },

    /// A required field is absent
    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    /// A vector field has the wrong number of components
    #[error("field '{field}' expects {expected} components, got {got}")]
    WrongArity {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// Timestamp string is neither numeric nor RFC 3339
    #[error("unparsable timestamp '{value}'")]
    BadTimestamp { value: String },

    /// Decoded values fail sample validation
    #[error("invalid sample: {0}")]
    InvalidSample(#[from] SampleDefect),
}

impl IngestionError {
    /// Short label used as a metrics tag
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionError::MalformedJson { .. } => "malformed_json",
            IngestionError::MalformedBinary { .. } => "malformed_binary",
            IngestionError::MissingField { .. } => "missing_field",
            IngestionError::WrongArity { .. } => "wrong_arity",
            IngestionError::BadTimestamp { .. } => "bad_timestamp",
            IngestionError::InvalidSample(_) => "invalid_sample",
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
