//! The schema-configured data-access object.

use crate::db_operations::{DbOperations, Row, Transaction};
use crate::error::{TableFoldError, TableFoldResult};
use crate::model::relationship::query::RelationshipQuery;
use crate::schema::types::{RelationshipDef, Schema, SchemaError};
use chrono::Utc;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const DELETED_AT: &str = "deleted_at";
const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// A data-access object configured once from a normalized schema and
/// used for the operations of a single logical request.
///
/// Configuration captures everything the schema declares about the
/// table: name, primary key, timestamp maintenance, soft-delete
/// capability, the writable column set, and one relationship
/// descriptor per `relationships` entry, reachable through the generic
/// [`DynamicModel::relationship`] accessor.
pub struct DynamicModel {
    db: Arc<DbOperations>,
    schema: Schema,
    table: String,
    primary_key: String,
    timestamps: bool,
    soft_delete: bool,
    writable_columns: Vec<String>,
    relationships: HashMap<String, RelationshipDef>,
}

impl DynamicModel {
    /// Configure a model from a normalized schema.
    pub fn from_schema(db: Arc<DbOperations>, schema: Schema) -> TableFoldResult<Self> {
        // Refuse half-canonical documents up front.
        schema.field_definitions()?;

        let relationships = schema
            .relationships
            .iter()
            .map(|rel| (rel.name.clone(), rel.clone()))
            .collect();

        Ok(Self {
            table: schema.table.clone(),
            primary_key: schema.primary_key.clone(),
            timestamps: schema.timestamps,
            soft_delete: schema.soft_delete,
            writable_columns: schema.writable_columns(),
            relationships,
            db,
            schema,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn supports_soft_delete(&self) -> bool {
        self.soft_delete
    }

    pub(crate) fn db(&self) -> &Arc<DbOperations> {
        &self.db
    }

    /// The primary key value of a row.
    pub fn id_of(&self, row: &Row) -> TableFoldResult<Value> {
        row.get(&self.primary_key).cloned().ok_or_else(|| {
            SchemaError::InvalidData(format!(
                "row in '{}' is missing primary key '{}'",
                self.table, self.primary_key
            ))
            .into()
        })
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339())
    }

    /// Copy the writable columns out of an input payload.
    fn writable_subset(&self, data: &Row) -> Row {
        let mut subset = Row::new();
        for column in &self.writable_columns {
            if let Some(value) = data.get(column) {
                subset.insert(column.clone(), value.clone());
            }
        }
        subset
    }

    /// Stage a new row. The primary key comes from the input when
    /// present, otherwise a fresh UUID is generated.
    pub fn create(&self, tx: &mut Transaction, data: &Row) -> TableFoldResult<Row> {
        let mut row = self.writable_subset(data);

        let id = data
            .get(&self.primary_key)
            .cloned()
            .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));
        row.insert(self.primary_key.clone(), id.clone());

        if self.timestamps {
            let now = Self::now();
            row.insert(CREATED_AT.to_string(), now.clone());
            row.insert(UPDATED_AT.to_string(), now);
        }

        debug!("Creating '{}' row {}", self.table, DbOperations::encode_key(&id));
        tx.put(&self.table, &id, row.clone());
        Ok(row)
    }

    /// Fetch a row, excluding soft-deleted rows.
    pub fn find(&self, tx: Option<&Transaction>, id: &Value) -> TableFoldResult<Option<Row>> {
        Ok(self
            .db
            .get_row(tx, &self.table, id)?
            .filter(|row| !Self::is_soft_deleted(row)))
    }

    /// Fetch a row including soft-deleted ones.
    pub fn find_with_deleted(
        &self,
        tx: Option<&Transaction>,
        id: &Value,
    ) -> TableFoldResult<Option<Row>> {
        self.db.get_row(tx, &self.table, id)
    }

    /// All live rows in key order.
    pub fn list(&self, tx: Option<&Transaction>) -> TableFoldResult<Vec<Row>> {
        Ok(self
            .db
            .scan_table(tx, &self.table)?
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| !Self::is_soft_deleted(row))
            .collect())
    }

    /// Stage an update of the writable columns. The row must exist.
    pub fn update(&self, tx: &mut Transaction, id: &Value, data: &Row) -> TableFoldResult<Row> {
        let mut row = self.find(Some(&*tx), id)?.ok_or_else(|| {
            TableFoldError::from(SchemaError::NotFound(format!(
                "no '{}' row with {} = {}",
                self.table,
                self.primary_key,
                DbOperations::encode_key(id)
            )))
        })?;

        for (column, value) in self.writable_subset(data) {
            row.insert(column, value);
        }
        if self.timestamps {
            row.insert(UPDATED_AT.to_string(), Self::now());
        }

        tx.put(&self.table, id, row.clone());
        Ok(row)
    }

    /// Stage a physical removal. Always hard; soft deletion is a
    /// separate, explicit operation.
    pub fn delete(&self, tx: &mut Transaction, id: &Value) -> TableFoldResult<()> {
        debug!("Deleting '{}' row {}", self.table, DbOperations::encode_key(id));
        tx.delete(&self.table, id);
        Ok(())
    }

    /// Stage a soft deletion: the row stays, marked with `deleted_at`.
    pub fn soft_delete(&self, tx: &mut Transaction, id: &Value) -> TableFoldResult<Row> {
        if !self.soft_delete {
            return Err(SchemaError::Validation(format!(
                "model '{}' does not support soft delete",
                self.schema.model
            ))
            .into());
        }

        let mut row = self.find_with_deleted(Some(&*tx), id)?.ok_or_else(|| {
            TableFoldError::from(SchemaError::NotFound(format!(
                "no '{}' row with {} = {}",
                self.table,
                self.primary_key,
                DbOperations::encode_key(id)
            )))
        })?;

        row.insert(DELETED_AT.to_string(), Self::now());
        if self.timestamps {
            row.insert(UPDATED_AT.to_string(), Self::now());
        }
        tx.put(&self.table, id, row.clone());
        Ok(row)
    }

    pub(crate) fn is_soft_deleted(row: &Row) -> bool {
        matches!(row.get(DELETED_AT), Some(value) if !value.is_null())
    }

    /// The relationship-query builder for a declared relationship.
    pub fn relationship(&self, name: &str) -> TableFoldResult<RelationshipQuery> {
        let definition = self.relationships.get(name).ok_or_else(|| {
            TableFoldError::from(SchemaError::NotFound(format!(
                "model '{}' has no relationship '{}'",
                self.schema.model, name
            )))
        })?;
        Ok(RelationshipQuery::new(
            self.db.clone(),
            definition.clone(),
            self.schema.default_sort.clone(),
        ))
    }

    /// Names of the configured relationships, in declaration order.
    pub fn relationship_names(&self) -> Vec<&str> {
        self.schema
            .relationships
            .iter()
            .map(|rel| rel.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalizer::SchemaNormalizer;
    use serde_json::json;
    use tempfile::tempdir;

    fn model(soft_delete: bool) -> (DynamicModel, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(DbOperations::open(dir.path()).unwrap());
        let schema: Schema = serde_json::from_value(json!({
            "model": "orders",
            "table": "orders",
            "soft_delete": soft_delete,
            "fields": {
                "id": {"type": "integer", "readonly": true},
                "status": {"type": "string"},
                "secret": {"type": "string", "readonly": true}
            },
            "relationships": [
                {"name": "items", "type": "many_to_many", "pivot_table": "order_items",
                 "foreign_key": "order_id", "related_key": "item_id"}
            ]
        }))
        .unwrap();
        let schema = SchemaNormalizer::normalize(schema).unwrap();
        (DynamicModel::from_schema(db, schema).unwrap(), dir)
    }

    #[test]
    fn create_filters_to_writable_columns() {
        let (model, _dir) = model(false);
        let mut tx = Transaction::new();
        let data = json!({"status": "open", "secret": "nope", "unknown": 1})
            .as_object()
            .unwrap()
            .clone();
        let row = model.create(&mut tx, &data).unwrap();

        assert_eq!(row.get("status").unwrap(), "open");
        assert!(row.get("secret").is_none());
        assert!(row.get("unknown").is_none());
        // Timestamps are on by default.
        assert!(row.get("created_at").is_some());
        // Generated primary key.
        assert!(row.get("id").unwrap().is_string());
    }

    #[test]
    fn update_requires_an_existing_row() {
        let (model, _dir) = model(false);
        let mut tx = Transaction::new();
        let data = json!({"status": "open"}).as_object().unwrap().clone();
        let err = model.update(&mut tx, &json!(404), &data).unwrap_err();
        assert!(matches!(
            err,
            TableFoldError::Schema(SchemaError::NotFound(_))
        ));
    }

    #[test]
    fn soft_delete_requires_capability() {
        let (model, _dir) = model(false);
        let mut tx = Transaction::new();
        assert!(matches!(
            model.soft_delete(&mut tx, &json!(1)).unwrap_err(),
            TableFoldError::Schema(SchemaError::Validation(_))
        ));
    }

    #[test]
    fn soft_deleted_rows_hide_from_find_and_list() {
        let (model, _dir) = model(true);
        let mut tx = Transaction::new();
        let data = json!({"id": 1, "status": "open"}).as_object().unwrap().clone();
        model.create(&mut tx, &data).unwrap();
        model.db().commit(tx).unwrap();

        let mut tx = Transaction::new();
        model.soft_delete(&mut tx, &json!(1)).unwrap();
        model.db().commit(tx).unwrap();

        assert!(model.find(None, &json!(1)).unwrap().is_none());
        assert!(model.list(None).unwrap().is_empty());
        // Still physically present.
        let row = model.find_with_deleted(None, &json!(1)).unwrap().unwrap();
        assert!(!row.get("deleted_at").unwrap().is_null());
    }

    #[test]
    fn relationship_accessor_is_generic() {
        let (model, _dir) = model(false);
        assert!(model.relationship("items").is_ok());
        assert!(matches!(
            model.relationship("nope").unwrap_err(),
            TableFoldError::Schema(SchemaError::NotFound(_))
        ));
        assert_eq!(model.relationship_names(), ["items"]);
    }
}
