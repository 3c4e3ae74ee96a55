//! TableFold: a schema-driven dynamic table and relationship engine.
//!
//! An operator describes a relational table (columns, relationships,
//! presentation rules) in a declarative JSON document, and the engine
//! exposes that table through read/write operations, relationship
//! traversal and cascading lifecycle behavior, with no per-table code.
//!
//! The pipeline: a model name resolves through the
//! [`schema::SchemaService`] (load → validate → normalize → two-tier
//! cache), the normalized schema configures a disposable
//! [`model::DynamicModel`], and lifecycle events drive the
//! relationship action processor and the cascade delete engine, all
//! inside one staged transaction per write.

pub mod config;
pub mod db_operations;
pub mod error;
pub mod model;
pub mod schema;
mod tablefold;

pub use config::{CacheConfig, EngineConfig};
pub use db_operations::{DbOperations, Row, Transaction};
pub use error::{TableFoldError, TableFoldResult};
pub use model::{
    CascadeDeleteEngine, DynamicModel, ListingParams, RelationshipActionProcessor,
    RelationshipListing, RelationshipQuery, RequestContext,
};
pub use schema::{Schema, SchemaError, SchemaService, TranslationProvider};
pub use tablefold::TableFold;
