//! Schema file resolution and loading.
//!
//! Schemas live as JSON documents under a configured directory, one
//! file per model. A connection-scoped lookup first checks the
//! connection's subdirectory, then falls back to the default location.

use crate::schema::types::{Schema, SchemaError, SchemaResult};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves and reads schema documents from disk.
pub struct SchemaLoader {
    schemas_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new<P: AsRef<Path>>(schemas_dir: P) -> Self {
        Self {
            schemas_dir: schemas_dir.as_ref().to_path_buf(),
        }
    }

    pub fn schemas_dir(&self) -> &Path {
        &self.schemas_dir
    }

    /// Candidate paths for a model, most specific first.
    fn candidate_paths(&self, model: &str, connection: Option<&str>) -> Vec<PathBuf> {
        let file_name = format!("{}.json", model);
        let mut paths = Vec::with_capacity(2);
        if let Some(connection) = connection {
            paths.push(self.schemas_dir.join(connection).join(&file_name));
        }
        paths.push(self.schemas_dir.join(&file_name));
        paths
    }

    /// Load the raw schema document for a model.
    ///
    /// Deserialization applies the documented defaults (`primary_key`,
    /// `timestamps`, `soft_delete`); no validation happens here.
    pub fn load(&self, model: &str, connection: Option<&str>) -> SchemaResult<Schema> {
        for path in self.candidate_paths(model, connection) {
            if !path.is_file() {
                continue;
            }
            debug!("Loading schema '{}' from {}", model, path.display());
            let contents = fs::read_to_string(&path)?;
            let document: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
                SchemaError::InvalidData(format!(
                    "Failed to parse schema file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            // A syntactically valid document that doesn't fit the
            // schema shape (missing model/table, a field without a
            // type) is a validation failure, not a parse failure.
            let schema: Schema = serde_json::from_value(document).map_err(|e| {
                SchemaError::Validation(format!(
                    "schema document for '{}' is malformed: {}",
                    model, e
                ))
            })?;
            return Ok(schema);
        }

        Err(SchemaError::NotFound(match connection {
            Some(connection) => format!(
                "no schema file for model '{}' (connection '{}') under {}",
                model,
                connection,
                self.schemas_dir.display()
            ),
            None => format!(
                "no schema file for model '{}' under {}",
                model,
                self.schemas_dir.display()
            ),
        }))
    }
}
