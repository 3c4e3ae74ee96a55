//! Crate-wide error handling.
//!
//! The schema pipeline has its own [`SchemaError`]; everything else
//! (storage, configuration, relationship side effects, cascade
//! deletes) folds into [`TableFoldError`]. Relationship and cascade
//! variants carry enough context (model, relationship/child, record
//! id) for the logs that precede re-raising them.

use crate::schema::types::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableFoldError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// An attach/sync/detach mutation failed against the store. The
    /// surrounding transaction must be discarded.
    #[error("Relationship processing failed for '{model}.{relationship}': {source}")]
    RelationshipProcessing {
        model: String,
        relationship: String,
        #[source]
        source: Box<TableFoldError>,
    },

    /// A child deletion failed mid-cascade. The surrounding transaction
    /// must be discarded.
    #[error("Cascade delete failed for child '{child}' of '{model}' (record {record}): {source}")]
    CascadeDelete {
        model: String,
        child: String,
        record: String,
        #[source]
        source: Box<TableFoldError>,
    },
}

/// Result type used across the engine.
pub type TableFoldResult<T> = Result<T, TableFoldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_convert() {
        let err: TableFoldError = SchemaError::NotFound("orders".to_string()).into();
        assert!(matches!(err, TableFoldError::Schema(SchemaError::NotFound(_))));
    }

    #[test]
    fn lifecycle_errors_carry_context() {
        let inner = TableFoldError::InvalidData("pivot write failed".to_string());
        let err = TableFoldError::RelationshipProcessing {
            model: "orders".to_string(),
            relationship: "items".to_string(),
            source: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.contains("orders.items"));
        assert!(msg.contains("pivot write failed"));
    }
}
