//! Relationship listings.
//!
//! One pivot scan joins a many-to-many relationship; a through
//! relationship chains two. The counting discipline is the critical
//! invariant of this module: `count` is computed on the join before
//! any search predicate, `count_filtered` after search but before
//! pagination, and `rows` is the post-pagination slice. Getting any of
//! these out of order corrupts downstream pagination math.

use crate::db_operations::{DbOperations, Row, Transaction};
use crate::error::TableFoldResult;
use crate::model::dynamic_model::DynamicModel;
use crate::schema::types::{RelationshipDef, RelationshipKind};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Parameters for one relationship listing request.
#[derive(Debug, Clone)]
pub struct ListingParams {
    pub search: Option<String>,
    /// Column name, `-` prefix for descending. Falls back to the
    /// parent schema's `default_sort`, then to pivot order.
    pub sort: Option<String>,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            page: 1,
            per_page: 15,
        }
    }
}

/// The three-field response shape downstream consumers rely on.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipListing {
    pub rows: Vec<Row>,
    /// Total related rows, before any search predicate.
    pub count: u64,
    /// Related rows matching the search, before pagination.
    pub count_filtered: u64,
}

/// A query builder scoped to one relationship of one parent record.
pub struct RelationshipQuery {
    db: Arc<DbOperations>,
    definition: RelationshipDef,
    default_sort: Option<String>,
}

impl std::fmt::Debug for RelationshipQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipQuery")
            .field("definition", &self.definition)
            .field("default_sort", &self.default_sort)
            .finish()
    }
}

impl RelationshipQuery {
    pub(crate) fn new(
        db: Arc<DbOperations>,
        definition: RelationshipDef,
        default_sort: Option<String>,
    ) -> Self {
        Self {
            db,
            definition,
            default_sort,
        }
    }

    pub fn definition(&self) -> &RelationshipDef {
        &self.definition
    }

    /// The related ids currently linked to `parent_id`, in pivot order.
    /// Through relationships are deduplicated: two intermediate rows
    /// pointing at the same target contribute one id.
    pub fn ids(&self, tx: Option<&Transaction>, parent_id: &Value) -> TableFoldResult<Vec<Value>> {
        match &self.definition.kind {
            RelationshipKind::ManyToMany {
                pivot_table,
                related_key,
                ..
            } => {
                let prefix = DbOperations::pivot_prefix(parent_id);
                let mut ids = Vec::new();
                for (_, pivot_row) in self.db.scan_table_prefix(tx, pivot_table, &prefix)? {
                    if let Some(id) = pivot_row.get(related_key) {
                        ids.push(id.clone());
                    }
                }
                Ok(ids)
            }
            RelationshipKind::BelongsToManyThrough {
                first_pivot_table,
                first_related_key,
                second_pivot_table,
                second_related_key,
                ..
            } => {
                let prefix = DbOperations::pivot_prefix(parent_id);
                let mut intermediate = Vec::new();
                for (_, pivot_row) in self.db.scan_table_prefix(tx, first_pivot_table, &prefix)? {
                    if let Some(id) = pivot_row.get(first_related_key) {
                        intermediate.push(id.clone());
                    }
                }

                let mut ids: Vec<Value> = Vec::new();
                for mid in intermediate {
                    let prefix = DbOperations::pivot_prefix(&mid);
                    for (_, pivot_row) in
                        self.db.scan_table_prefix(tx, second_pivot_table, &prefix)?
                    {
                        if let Some(id) = pivot_row.get(second_related_key) {
                            if !ids.contains(id) {
                                ids.push(id.clone());
                            }
                        }
                    }
                }
                Ok(ids)
            }
        }
    }

    /// Join the relationship and load the related rows, attaching each
    /// pivot row under `"pivot"` for direct relationships.
    fn joined_rows(
        &self,
        tx: Option<&Transaction>,
        parent_id: &Value,
    ) -> TableFoldResult<Vec<Row>> {
        let target_table = self.definition.target_table().to_string();
        let mut rows = Vec::new();

        match &self.definition.kind {
            RelationshipKind::ManyToMany {
                pivot_table,
                related_key,
                ..
            } => {
                let prefix = DbOperations::pivot_prefix(parent_id);
                for (_, pivot_row) in self.db.scan_table_prefix(tx, pivot_table, &prefix)? {
                    let Some(related_id) = pivot_row.get(related_key) else {
                        continue;
                    };
                    let Some(mut row) = self.db.get_row(tx, &target_table, related_id)? else {
                        // Dangling pivot entry; the related row is gone.
                        continue;
                    };
                    if DynamicModel::is_soft_deleted(&row) {
                        continue;
                    }
                    row.insert("pivot".to_string(), Value::Object(pivot_row));
                    rows.push(row);
                }
            }
            RelationshipKind::BelongsToManyThrough { .. } => {
                for related_id in self.ids(tx, parent_id)? {
                    let Some(row) = self.db.get_row(tx, &target_table, &related_id)? else {
                        continue;
                    };
                    if DynamicModel::is_soft_deleted(&row) {
                        continue;
                    }
                    rows.push(row);
                }
            }
        }

        Ok(rows)
    }

    /// Compute a listing for `parent_id`.
    pub fn list(
        &self,
        tx: Option<&Transaction>,
        parent_id: &Value,
        params: &ListingParams,
    ) -> TableFoldResult<RelationshipListing> {
        let joined = self.joined_rows(tx, parent_id)?;

        // Total count on the join, before any filtering.
        let count = joined.len() as u64;

        let mut filtered: Vec<Row> = match &params.search {
            Some(term) if !term.is_empty() => {
                let needle = term.to_lowercase();
                joined
                    .into_iter()
                    .filter(|row| Self::matches_search(row, &needle))
                    .collect()
            }
            _ => joined,
        };

        // Filtered count after search, before pagination.
        let count_filtered = filtered.len() as u64;

        let sort = params.sort.as_deref().or(self.default_sort.as_deref());
        if let Some(sort) = sort {
            let (column, descending) = match sort.strip_prefix('-') {
                Some(column) => (column, true),
                None => (sort, false),
            };
            filtered.sort_by(|a, b| {
                let ordering = Self::compare_values(a.get(column), b.get(column));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let offset = params.page.saturating_sub(1) * params.per_page;
        let rows = filtered
            .into_iter()
            .skip(offset)
            .take(params.per_page)
            .collect();

        Ok(RelationshipListing {
            rows,
            count,
            count_filtered,
        })
    }

    /// Case-insensitive substring match over string-valued columns.
    fn matches_search(row: &Row, needle: &str) -> bool {
        row.values().any(|value| match value {
            Value::String(s) => s.to_lowercase().contains(needle),
            _ => false,
        })
    }

    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (Some(Value::Number(a)), Some(Value::Number(b))) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
            (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::RelationshipDef;
    use serde_json::json;
    use tempfile::tempdir;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn seed_many_to_many(db: &DbOperations) {
        let mut tx = Transaction::new();
        for (id, name) in [(7, "keyboard"), (8, "mouse"), (9, "monitor")] {
            tx.put("items", &json!(id), row(json!({"id": id, "name": name})));
        }
        for item in [7, 8, 9] {
            tx.put_encoded(
                "order_items",
                format!("1:{}", item),
                row(json!({"order_id": 1, "item_id": item})),
            );
        }
        db.commit(tx).unwrap();
    }

    fn items_query(db: Arc<DbOperations>) -> RelationshipQuery {
        let definition: RelationshipDef = serde_json::from_value(json!({
            "name": "items",
            "type": "many_to_many",
            "pivot_table": "order_items",
            "foreign_key": "order_id",
            "related_key": "item_id",
            "model": "items",
            "related_table": "items"
        }))
        .unwrap();
        RelationshipQuery::new(db, definition, None)
    }

    #[test]
    fn counts_follow_the_invariant() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DbOperations::open(dir.path()).unwrap());
        seed_many_to_many(&db);
        let query = items_query(db);

        // n = 3 related rows, search matches k = 2, page size p = 1.
        let params = ListingParams {
            search: Some("mo".to_string()),
            per_page: 1,
            ..Default::default()
        };
        let listing = query.list(None, &json!(1), &params).unwrap();
        assert_eq!(listing.count, 3);
        assert_eq!(listing.count_filtered, 2);
        assert_eq!(listing.rows.len(), 1);
    }

    #[test]
    fn pivot_data_rides_along() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DbOperations::open(dir.path()).unwrap());
        seed_many_to_many(&db);
        let query = items_query(db);

        let listing = query.list(None, &json!(1), &ListingParams::default()).unwrap();
        let pivot = listing.rows[0].get("pivot").unwrap();
        assert_eq!(pivot.get("order_id").unwrap(), &json!(1));
    }

    #[test]
    fn sorting_and_pagination() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DbOperations::open(dir.path()).unwrap());
        seed_many_to_many(&db);
        let query = items_query(db);

        let params = ListingParams {
            sort: Some("-name".to_string()),
            page: 2,
            per_page: 2,
            ..Default::default()
        };
        let listing = query.list(None, &json!(1), &params).unwrap();
        // monitor, mouse | keyboard: page 2 holds the last row.
        assert_eq!(listing.rows.len(), 1);
        assert_eq!(listing.rows[0].get("name").unwrap(), "keyboard");
        assert_eq!(listing.count, 3);
        assert_eq!(listing.count_filtered, 3);
    }

    #[test]
    fn through_relationship_joins_and_dedups() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DbOperations::open(dir.path()).unwrap());

        let mut tx = Transaction::new();
        for (id, name) in [(100, "read"), (200, "write")] {
            tx.put("permissions", &json!(id), row(json!({"id": id, "name": name})));
        }
        // user 1 has roles 10 and 11; both grant permission 100.
        for role in [10, 11] {
            tx.put_encoded(
                "user_roles",
                format!("1:{}", role),
                row(json!({"user_id": 1, "role_id": role})),
            );
        }
        tx.put_encoded(
            "role_permissions",
            "10:100".to_string(),
            row(json!({"role_id": 10, "permission_id": 100})),
        );
        tx.put_encoded(
            "role_permissions",
            "11:100".to_string(),
            row(json!({"role_id": 11, "permission_id": 100})),
        );
        tx.put_encoded(
            "role_permissions",
            "11:200".to_string(),
            row(json!({"role_id": 11, "permission_id": 200})),
        );
        db.commit(tx).unwrap();

        let definition: RelationshipDef = serde_json::from_value(json!({
            "name": "permissions",
            "type": "belongs_to_many_through",
            "through": "roles",
            "first_pivot_table": "user_roles",
            "first_foreign_key": "user_id",
            "first_related_key": "role_id",
            "second_pivot_table": "role_permissions",
            "second_foreign_key": "role_id",
            "second_related_key": "permission_id",
            "model": "permissions",
            "related_table": "permissions"
        }))
        .unwrap();
        let query = RelationshipQuery::new(db, definition, None);

        let ids = query.ids(None, &json!(1)).unwrap();
        assert_eq!(ids, vec![json!(100), json!(200)]);

        let listing = query.list(None, &json!(1), &ListingParams::default()).unwrap();
        assert_eq!(listing.count, 2);
        assert_eq!(listing.rows.len(), 2);
    }
}
