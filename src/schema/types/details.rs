//! Child-table cascade declarations.

use serde::{Deserialize, Serialize};

/// One `details` entry: a child model whose rows follow the parent's
/// lifecycle. `cascade_delete` defaults on; `auto` mode lets a soft
/// parent delete soft-delete capable children, `hard` forces physical
/// removal regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailDef {
    pub model: String,
    pub foreign_key: String,

    #[serde(default = "default_cascade_delete")]
    pub cascade_delete: bool,

    #[serde(default)]
    pub cascade_delete_mode: CascadeMode,
}

fn default_cascade_delete() -> bool {
    true
}

/// How cascade deletion treats soft-delete capable children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    #[default]
    Auto,
    Hard,
}
