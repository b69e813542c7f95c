//! Error types for row decoding and table naming

use thiserror::Error;

/// Errors raised while interpreting server payloads or table names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid decimal for {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("Invalid flag for {field}: {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
