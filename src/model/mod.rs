//! Runtime-configured data access.
//!
//! A [`DynamicModel`] is a disposable object configured from one
//! normalized schema: it knows its table, primary key, timestamp and
//! soft-delete behavior, column set and relationships, and behaves
//! like a hand-written model for that table. The `relationship`
//! submodule holds the query engine plus the lifecycle processors
//! (attach/sync/detach and cascade deletion).

pub mod dynamic_model;
pub mod relationship;

pub use dynamic_model::DynamicModel;
pub use relationship::cascade::CascadeDeleteEngine;
pub use relationship::processor::RelationshipActionProcessor;
pub use relationship::query::{ListingParams, RelationshipListing, RelationshipQuery};

/// The acting identity for one engine invocation. Supplies the
/// `current_user` pivot-data placeholder; permission *enforcement*
/// stays with the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
        }
    }
}
