//! The relationship listing response shape and its counting
//! discipline: total before filtering, filtered before pagination.

mod common;

use common::{engine, row, seed_items};
use serde_json::json;
use tablefold::{ListingParams, RequestContext, Transaction};

#[test]
fn counts_are_computed_in_the_right_order() {
    let (engine, _dir) = engine();
    seed_items(&engine);
    let ctx = RequestContext::anonymous();

    let order = engine
        .create_record("orders", row(json!({"reference": "B-1"})), &ctx)
        .unwrap();
    let order_id = order.get("id").unwrap().clone();
    engine
        .update_record(
            "orders",
            &order_id,
            row(json!({"item_ids": [7, 8, 9, 10]})),
            &ctx,
        )
        .unwrap();

    // n = 4 related rows; "mo" matches mouse, monitor, mousepad (k = 3);
    // page size p = 2.
    let params = ListingParams {
        search: Some("mo".to_string()),
        per_page: 2,
        ..Default::default()
    };
    let listing = engine
        .relationship_listing("orders", &order_id, "items", &params)
        .unwrap();
    assert_eq!(listing.count, 4);
    assert_eq!(listing.count_filtered, 3);
    assert_eq!(listing.rows.len(), 2);

    // Page 2 holds the remaining match: len(rows) == min(p, k - p).
    let params = ListingParams {
        search: Some("mo".to_string()),
        page: 2,
        per_page: 2,
        ..Default::default()
    };
    let listing = engine
        .relationship_listing("orders", &order_id, "items", &params)
        .unwrap();
    assert_eq!(listing.count, 4);
    assert_eq!(listing.count_filtered, 3);
    assert_eq!(listing.rows.len(), 1);
}

#[test]
fn search_misses_keep_the_total() {
    let (engine, _dir) = engine();
    seed_items(&engine);
    let ctx = RequestContext::anonymous();

    let order = engine
        .create_record("orders", row(json!({"reference": "B-2"})), &ctx)
        .unwrap();
    let order_id = order.get("id").unwrap().clone();
    engine
        .update_record("orders", &order_id, row(json!({"item_ids": [7, 8]})), &ctx)
        .unwrap();

    let params = ListingParams {
        search: Some("no-such-item".to_string()),
        ..Default::default()
    };
    let listing = engine
        .relationship_listing("orders", &order_id, "items", &params)
        .unwrap();
    assert_eq!(listing.count, 2);
    assert_eq!(listing.count_filtered, 0);
    assert!(listing.rows.is_empty());
}

#[test]
fn through_relationships_traverse_two_pivots() {
    let (engine, _dir) = engine();
    let ctx = RequestContext::anonymous();

    engine
        .create_record("users", row(json!({"id": 1, "name": "ada"})), &ctx)
        .unwrap();
    for (id, name) in [(100, "articles.read"), (200, "articles.write")] {
        engine
            .create_record("permissions", row(json!({"id": id, "name": name})), &ctx)
            .unwrap();
    }

    // user 1 -> roles 10, 11; both roles grant permission 100, role 11
    // also grants 200.
    let db = engine.db_operations();
    let mut tx = Transaction::new();
    for role in [10, 11] {
        tx.put_encoded(
            "user_roles",
            format!("1:{}", role),
            row(json!({"user_id": 1, "role_id": role})),
        );
    }
    for (role, permission) in [(10, 100), (11, 100), (11, 200)] {
        tx.put_encoded(
            "role_permissions",
            format!("{}:{}", role, permission),
            row(json!({"role_id": role, "permission_id": permission})),
        );
    }
    db.commit(tx).unwrap();

    // Duplicate grants collapse: 100 appears once.
    let listing = engine
        .relationship_listing("users", &json!(1), "permissions", &ListingParams::default())
        .unwrap();
    assert_eq!(listing.count, 2);
    assert_eq!(listing.count_filtered, 2);

    let params = ListingParams {
        search: Some("write".to_string()),
        ..Default::default()
    };
    let listing = engine
        .relationship_listing("users", &json!(1), "permissions", &params)
        .unwrap();
    assert_eq!(listing.count, 2);
    assert_eq!(listing.count_filtered, 1);
    assert_eq!(listing.rows[0].get("name").unwrap(), "articles.write");
}

#[test]
fn response_shape_serializes_with_three_fields() {
    let (engine, _dir) = engine();
    seed_items(&engine);
    let ctx = RequestContext::anonymous();

    let order = engine
        .create_record("orders", row(json!({"reference": "B-3"})), &ctx)
        .unwrap();
    let order_id = order.get("id").unwrap().clone();

    let listing = engine
        .relationship_listing("orders", &order_id, "items", &ListingParams::default())
        .unwrap();
    let value = serde_json::to_value(&listing).unwrap();
    let obj = value.as_object().unwrap();
    assert!(obj.contains_key("rows"));
    assert!(obj.contains_key("count"));
    assert!(obj.contains_key("count_filtered"));
    assert_eq!(obj.len(), 3);
}
