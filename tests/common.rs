//! Shared helpers for integration tests.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tablefold::{EngineConfig, Row, TableFold};
use tempfile::TempDir;

/// Build an engine over a tempdir seeded with the standard test
/// schemas: orders (soft-delete, items relationship with lifecycle
/// actions, order_notes cascade), items, order_notes, and a
/// users/roles/permissions through-relationship set.
pub fn engine() -> (TableFold, TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().expect("tempdir");
    let schemas_dir = dir.path().join("schemas");
    fs::create_dir_all(&schemas_dir).expect("schemas dir");

    write_schema(&schemas_dir, "orders", orders_schema());
    write_schema(&schemas_dir, "items", items_schema());
    write_schema(&schemas_dir, "order_notes", order_notes_schema());
    write_schema(&schemas_dir, "users", users_schema());
    write_schema(&schemas_dir, "permissions", permissions_schema());

    let config = EngineConfig::new(&schemas_dir, dir.path().join("db"));
    let engine = TableFold::new(config).expect("engine");
    (engine, dir)
}

pub fn write_schema(dir: &Path, name: &str, doc: Value) {
    fs::write(dir.join(format!("{}.json", name)), doc.to_string()).expect("schema file");
}

pub fn row(value: Value) -> Row {
    value.as_object().expect("object").clone()
}

fn orders_schema() -> Value {
    json!({
        "model": "orders",
        "table": "orders",
        "soft_delete": true,
        "fields": {
            "id": {"type": "string", "readonly": true},
            "reference": {"type": "string", "required": true},
            "status": "string"
        },
        "relationships": [
            {
                "name": "items",
                "type": "many_to_many",
                "pivot_table": "order_items",
                "foreign_key": "order_id",
                "related_key": "item_id",
                "actions": {
                    "on_create": {
                        "attach": [
                            {"related_id": 7,
                             "pivot_data": {"qty": 2, "assigned_at": "now",
                                            "assigned_by": "current_user"}}
                        ]
                    },
                    "on_update": {"sync": {"field": "item_ids"}},
                    "on_delete": {"detach": "all"}
                }
            }
        ],
        "details": [
            {"model": "order_notes", "foreign_key": "order_id"}
        ]
    })
}

fn items_schema() -> Value {
    json!({
        "model": "items",
        "table": "items",
        "timestamps": false,
        "fields": {
            "id": {"type": "integer", "readonly": true},
            "name": {"type": "string"}
        }
    })
}

fn order_notes_schema() -> Value {
    json!({
        "model": "order_notes",
        "table": "order_notes",
        "timestamps": false,
        "fields": {
            "id": {"type": "string", "readonly": true},
            "order_id": {"type": "string"},
            "body": {"type": "text"}
        }
    })
}

fn users_schema() -> Value {
    json!({
        "model": "users",
        "table": "users",
        "timestamps": false,
        "fields": {
            "id": {"type": "integer", "readonly": true},
            "name": {"type": "string"}
        },
        "relationships": [
            {
                "name": "permissions",
                "type": "belongs_to_many_through",
                "through": "roles",
                "first_pivot_table": "user_roles",
                "first_foreign_key": "user_id",
                "first_related_key": "role_id",
                "second_pivot_table": "role_permissions",
                "second_foreign_key": "role_id",
                "second_related_key": "permission_id",
                "model": "permissions"
            }
        ]
    })
}

fn permissions_schema() -> Value {
    json!({
        "model": "permissions",
        "table": "permissions",
        "timestamps": false,
        "fields": {
            "id": {"type": "integer", "readonly": true},
            "name": {"type": "string"}
        }
    })
}

/// Seed the standard item rows (7, 8, 9, 10).
pub fn seed_items(engine: &TableFold) {
    let ctx = tablefold::RequestContext::anonymous();
    for (id, name) in [(7, "keyboard"), (8, "mouse"), (9, "monitor"), (10, "mousepad")] {
        engine
            .create_record("items", row(json!({"id": id, "name": name})), &ctx)
            .expect("seed item");
    }
}
