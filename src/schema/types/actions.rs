//! Operation (action) declarations exposed on list and detail surfaces.

use serde::{Deserialize, Serialize};

/// A declared or synthesized model action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub kind: ActionKind,

    #[serde(default)]
    pub scope: ActionScope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,

    /// Target column for toggle actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Edit,
    Delete,
    Toggle,
    #[default]
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionScope {
    List,
    Detail,
    #[default]
    Both,
}

impl ActionScope {
    /// Whether an action with this scope is visible on the given surface.
    pub fn includes(&self, surface: ActionScope) -> bool {
        matches!(self, Self::Both) || *self == surface
    }
}
