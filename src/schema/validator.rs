//! Structural schema validation.
//!
//! Runs before normalization and caching so a malformed document can
//! never be trusted, normalized or cached by any later component.

use crate::schema::types::{FieldEntry, FieldType, Schema, SchemaError, SchemaResult};
use std::collections::HashSet;

/// Validates a [`Schema`] against the structural rules every other
/// component relies on.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate the given schema, loaded under `requested_model`.
    pub fn validate(schema: &Schema, requested_model: &str) -> SchemaResult<()> {
        if schema.model.is_empty() {
            return Err(SchemaError::Validation(
                "schema is missing required field 'model'".to_string(),
            ));
        }

        if schema.model != requested_model {
            return Err(SchemaError::Validation(format!(
                "schema 'model' is '{}' but was loaded as '{}'",
                schema.model, requested_model
            )));
        }

        if schema.table.is_empty() {
            return Err(SchemaError::Validation(format!(
                "schema '{}' is missing required field 'table'",
                schema.model
            )));
        }

        if schema.primary_key.is_empty() {
            return Err(SchemaError::Validation(format!(
                "schema '{}' has an empty 'primary_key'",
                schema.model
            )));
        }

        if schema.fields.is_empty() {
            return Err(SchemaError::Validation(format!(
                "schema '{}' must declare at least one field",
                schema.model
            )));
        }

        for (name, entry) in &schema.fields {
            if name.is_empty() {
                return Err(SchemaError::Validation(format!(
                    "schema '{}' contains a field with an empty name",
                    schema.model
                )));
            }
            // A shorthand entry must still name a real type.
            if let FieldEntry::Shorthand(type_name) = entry {
                if FieldType::from_name(type_name).is_none() {
                    return Err(SchemaError::Validation(format!(
                        "field '{}' in schema '{}' declares unknown type '{}'",
                        name, schema.model, type_name
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for rel in &schema.relationships {
            if rel.name.is_empty() {
                return Err(SchemaError::Validation(format!(
                    "schema '{}' contains a relationship with an empty name",
                    schema.model
                )));
            }
            if !seen.insert(rel.name.as_str()) {
                return Err(SchemaError::Validation(format!(
                    "schema '{}' declares relationship '{}' more than once",
                    schema.model, rel.name
                )));
            }
        }

        for detail in &schema.details {
            if detail.model.is_empty() || detail.foreign_key.is_empty() {
                return Err(SchemaError::Validation(format!(
                    "schema '{}' has a details entry missing 'model' or 'foreign_key'",
                    schema.model
                )));
            }
        }

        Ok(())
    }
}
