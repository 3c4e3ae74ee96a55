//! Core database operations over sled.

use super::transaction::Transaction;
use super::Row;
use crate::error::TableFoldResult;
use crate::schema::types::SchemaError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const ROW_TREE_PREFIX: &str = "rows:";

/// Database operations struct providing unified access to row storage.
///
/// Trees are opened on demand and cached by sled itself; all values are
/// JSON documents, matching the schema pipeline's wire format.
#[derive(Clone)]
pub struct DbOperations {
    db: sled::Db,
}

impl DbOperations {
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    /// Open (or create) a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> TableFoldResult<Self> {
        let db = sled::open(path)?;
        Ok(Self::new(db))
    }

    /// The underlying sled instance (shared-cache tier and tests use it).
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn table_tree(&self, table: &str) -> Result<sled::Tree, SchemaError> {
        self.db
            .open_tree(format!("{}{}", ROW_TREE_PREFIX, table))
            .map_err(|e| SchemaError::InvalidData(format!("Failed to open table '{}': {}", table, e)))
    }

    /// Canonical string form of a key value. Strings are used verbatim,
    /// numbers and booleans via their display form; anything else falls
    /// back to its JSON encoding.
    pub fn encode_key(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    /// Composite key for a pivot row.
    pub fn pivot_key(left: &Value, right: &Value) -> String {
        format!("{}:{}", Self::encode_key(left), Self::encode_key(right))
    }

    /// Prefix matching every pivot row for one left-hand id.
    pub fn pivot_prefix(left: &Value) -> String {
        format!("{}:", Self::encode_key(left))
    }

    fn decode_row(table: &str, key: &[u8], bytes: &[u8]) -> Result<Row, SchemaError> {
        serde_json::from_slice(bytes).map_err(|e| {
            SchemaError::InvalidData(format!(
                "Row deserialization failed for '{}/{}': {}",
                table,
                String::from_utf8_lossy(key),
                e
            ))
        })
    }

    /// Fetch one row, observing any staged transaction state.
    pub fn get_row(
        &self,
        tx: Option<&Transaction>,
        table: &str,
        key: &Value,
    ) -> TableFoldResult<Option<Row>> {
        let encoded = Self::encode_key(key);
        if let Some(tx) = tx {
            if let Some(staged) = tx.staged_state(table, &encoded) {
                return Ok(staged.cloned());
            }
        }

        let tree = self.table_tree(table)?;
        match tree.get(encoded.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::decode_row(table, encoded.as_bytes(), &bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(SchemaError::InvalidData(format!(
                "Row retrieval failed for '{}/{}': {}",
                table, encoded, e
            ))
            .into()),
        }
    }

    /// All rows of a table in key order, observing staged state.
    pub fn scan_table(
        &self,
        tx: Option<&Transaction>,
        table: &str,
    ) -> TableFoldResult<Vec<(String, Row)>> {
        self.scan_table_prefix(tx, table, "")
    }

    /// Rows whose key starts with `prefix`, in key order, observing
    /// staged state.
    pub fn scan_table_prefix(
        &self,
        tx: Option<&Transaction>,
        table: &str,
        prefix: &str,
    ) -> TableFoldResult<Vec<(String, Row)>> {
        let tree = self.table_tree(table)?;
        let mut rows = BTreeMap::new();

        for result in tree.scan_prefix(prefix.as_bytes()) {
            let (key, bytes) = result.map_err(|e| {
                SchemaError::InvalidData(format!("Table scan failed for '{}': {}", table, e))
            })?;
            let key_str = String::from_utf8_lossy(&key).to_string();
            rows.insert(key_str.clone(), Self::decode_row(table, &key, &bytes)?);
        }

        if let Some(tx) = tx {
            tx.apply_overlay(table, prefix, &mut rows);
        }

        Ok(rows.into_iter().collect())
    }

    /// Apply a staged transaction: per-table atomic batches, then a
    /// durability flush. A transaction dropped without commit changes
    /// nothing.
    pub fn commit(&self, tx: Transaction) -> TableFoldResult<()> {
        for (table, states) in tx.into_table_states() {
            let tree = self.table_tree(&table)?;
            let mut batch = sled::Batch::default();
            for (key, state) in states {
                match state {
                    Some(row) => {
                        let bytes = serde_json::to_vec(&row).map_err(|e| {
                            SchemaError::InvalidData(format!(
                                "Row serialization failed for '{}/{}': {}",
                                table, key, e
                            ))
                        })?;
                        batch.insert(key.as_bytes(), bytes);
                    }
                    None => batch.remove(key.as_bytes()),
                }
            }
            tree.apply_batch(batch)
                .map_err(|e| SchemaError::InvalidData(format!("Commit failed for '{}': {}", table, e)))?;
        }

        self.db
            .flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}
