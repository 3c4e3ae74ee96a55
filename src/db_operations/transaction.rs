//! Staged write sets.
//!
//! A [`Transaction`] accumulates puts and deletes without touching the
//! store. Reads issued through the owning [`DbOperations`] observe the
//! staged state, so lifecycle logic (relationship actions, cascade
//! deletes) sees its own writes. Committing applies the final state of
//! every key atomically per tree; dropping the transaction discards it
//! all, which is what makes failed operations all-or-nothing.

use super::core::DbOperations;
use super::Row;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// The staged final state of one key: `Some(row)` for a put, `None`
/// for a delete. A later write to the same key replaces the earlier one.
type KeyState = Option<Row>;

#[derive(Default)]
pub struct Transaction {
    tables: HashMap<String, BTreeMap<String, KeyState>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a row write.
    pub fn put(&mut self, table: &str, key: &Value, row: Row) {
        self.put_encoded(table, DbOperations::encode_key(key), row);
    }

    /// Stage a row write with an already-encoded key (pivot rows).
    pub fn put_encoded(&mut self, table: &str, key: String, row: Row) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key, Some(row));
    }

    /// Stage a row deletion.
    pub fn delete(&mut self, table: &str, key: &Value) {
        self.delete_encoded(table, DbOperations::encode_key(key));
    }

    /// Stage a deletion with an already-encoded key.
    pub fn delete_encoded(&mut self, table: &str, key: String) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key, None);
    }

    /// Number of staged key states across all tables.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The staged state of a key, if this transaction touched it.
    pub(crate) fn staged_state(&self, table: &str, key: &str) -> Option<Option<&Row>> {
        self.tables
            .get(table)
            .and_then(|states| states.get(key))
            .map(Option::as_ref)
    }

    /// Merge staged states into a scan result limited to `prefix`.
    pub(crate) fn apply_overlay(
        &self,
        table: &str,
        prefix: &str,
        rows: &mut BTreeMap<String, Row>,
    ) {
        let Some(states) = self.tables.get(table) else {
            return;
        };
        for (key, state) in states {
            if !key.starts_with(prefix) {
                continue;
            }
            match state {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
    }

    /// Consume the transaction into per-table final states for commit.
    pub(crate) fn into_table_states(
        self,
    ) -> impl Iterator<Item = (String, BTreeMap<String, KeyState>)> {
        self.tables.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn later_writes_replace_earlier_ones() {
        let mut tx = Transaction::new();
        tx.put("orders", &json!(1), row(json!({"v": 1})));
        tx.put("orders", &json!(1), row(json!({"v": 2})));
        assert_eq!(tx.len(), 1);

        let state = tx.staged_state("orders", "1").unwrap().unwrap();
        assert_eq!(state.get("v").unwrap(), 2);

        tx.delete("orders", &json!(1));
        assert!(tx.staged_state("orders", "1").unwrap().is_none());
    }

    #[test]
    fn overlay_respects_prefix() {
        let mut tx = Transaction::new();
        tx.put_encoded("pivots", "1:7".to_string(), row(json!({"a": 1})));
        tx.put_encoded("pivots", "2:7".to_string(), row(json!({"a": 2})));
        tx.delete_encoded("pivots", "1:3".to_string());

        let mut rows = BTreeMap::new();
        rows.insert("1:3".to_string(), row(json!({"old": true})));
        tx.apply_overlay("pivots", "1:", &mut rows);

        let keys: Vec<&String> = rows.keys().collect();
        assert_eq!(keys, ["1:7"]);
    }
}
