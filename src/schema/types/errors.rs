use thiserror::Error;

/// Errors raised by the schema pipeline (loading, validation,
/// normalization and caching).
///
/// `NotFound` and `Validation` are the two kinds callers are expected
/// to branch on; the remaining variants carry the underlying cause.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Schema validation failed: {0}")]
    Validation(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for schema pipeline operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
