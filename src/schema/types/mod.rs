//! Core types for the schema system.

pub mod actions;
pub mod details;
pub mod errors;
pub mod fields;
pub mod relationships;
pub mod schema;

pub use actions::{ActionDef, ActionKind, ActionScope};
pub use details::{CascadeMode, DetailDef};
pub use errors::{SchemaError, SchemaResult};
pub use fields::{
    BooleanUi, BooleanUiEntry, FieldDefinition, FieldEntry, FieldType, LookupEntry, LookupSpec,
    ShowIn,
};
pub use relationships::{
    AttachInstruction, DetachSpec, EventActions, LifecycleEvent, RelationshipActions,
    RelationshipDef, RelationshipKind, SyncSpec,
};
pub use schema::Schema;
