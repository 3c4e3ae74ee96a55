//! Relationship definitions: the two supported pivot shapes and the
//! lifecycle actions (attach/sync/detach) that run as side effects of
//! create, update and delete.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A named relationship declared on a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,

    #[serde(flatten)]
    pub kind: RelationshipKind,

    /// Related model name; normalized to `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Table holding the related rows; normalized to `model` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_table: Option<String>,

    #[serde(default, skip_serializing_if = "RelationshipActions::is_empty")]
    pub actions: RelationshipActions,
}

impl RelationshipDef {
    /// Related model name after normalization.
    pub fn related_model(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.name)
    }

    /// Table the related rows live in after normalization.
    pub fn target_table(&self) -> &str {
        self.related_table
            .as_deref()
            .unwrap_or_else(|| self.related_model())
    }
}

/// The two supported relationship shapes, dispatched as a tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Direct many-to-many via a single pivot table.
    ManyToMany {
        pivot_table: String,
        foreign_key: String,
        related_key: String,
    },
    /// Two-hop relationship traversing an intermediate model.
    BelongsToManyThrough {
        through: String,
        first_pivot_table: String,
        first_foreign_key: String,
        first_related_key: String,
        second_pivot_table: String,
        second_foreign_key: String,
        second_related_key: String,
    },
}

/// Lifecycle event that triggers relationship actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    OnCreate,
    OnUpdate,
    OnDelete,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnCreate => write!(f, "on_create"),
            Self::OnUpdate => write!(f, "on_update"),
            Self::OnDelete => write!(f, "on_delete"),
        }
    }
}

/// Actions keyed by lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_create: Option<EventActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<EventActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<EventActions>,
}

impl RelationshipActions {
    pub fn is_empty(&self) -> bool {
        self.on_create.is_none() && self.on_update.is_none() && self.on_delete.is_none()
    }

    pub fn for_event(&self, event: LifecycleEvent) -> Option<&EventActions> {
        match event {
            LifecycleEvent::OnCreate => self.on_create.as_ref(),
            LifecycleEvent::OnUpdate => self.on_update.as_ref(),
            LifecycleEvent::OnDelete => self.on_delete.as_ref(),
        }
    }
}

/// The instructions configured for one lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attach: Vec<AttachInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detach: Option<DetachSpec>,
}

/// One attach instruction: a related id plus optional pivot data.
///
/// An instruction without a `related_id` is skipped with a warning
/// rather than failing the whole operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachInstruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Value>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub pivot_data: serde_json::Map<String, Value>,
}

/// Sync configuration: which input field carries the id list.
/// Defaults to `{relationship}_ids` when `field` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Detach configuration: the string `"all"`, an explicit id list, or
/// anything else (invalid, logged and skipped by the processor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetachSpec {
    Keyword(String),
    Ids(Vec<Value>),
    Invalid(Value),
}

impl DetachSpec {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::Keyword(kw) if kw == "all")
    }
}
