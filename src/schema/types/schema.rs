//! The schema document: the declarative description of one table's
//! shape, relationships and presentation rules.

use super::actions::ActionDef;
use super::details::DetailDef;
use super::errors::SchemaError;
use super::fields::{FieldDefinition, FieldEntry};
use super::relationships::RelationshipDef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A schema document, as authored (possibly with shorthand) or as
/// normalized. `primary_key`, `timestamps` and `soft_delete` get their
/// documented defaults at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub model: String,
    pub table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    #[serde(default = "default_timestamps")]
    pub timestamps: bool,

    #[serde(default)]
    pub soft_delete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub permissions: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<String>,

    /// Ordered field map; author order is preserved through the
    /// pipeline and into every projection.
    pub fields: IndexMap<String, FieldEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionDef>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_timestamps() -> bool {
    true
}

impl Schema {
    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    /// Iterate fields as full definitions.
    ///
    /// Only valid on a normalized schema; shorthand entries that have
    /// not been expanded yet produce an error so callers can't silently
    /// operate on a half-canonical document.
    pub fn field_definitions(
        &self,
    ) -> Result<Vec<(&str, &FieldDefinition)>, SchemaError> {
        let mut defs = Vec::with_capacity(self.fields.len());
        for (name, entry) in &self.fields {
            match entry.definition() {
                Some(def) => defs.push((name.as_str(), def)),
                None => {
                    return Err(SchemaError::InvalidData(format!(
                        "Field '{}' in schema '{}' has not been normalized",
                        name, self.model
                    )))
                }
            }
        }
        Ok(defs)
    }

    /// Column names a write operation may populate: non-readonly
    /// fields, excluding the primary key.
    pub fn writable_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(name, entry)| {
                *name != &self.primary_key
                    && entry.definition().map(|def| !def.readonly).unwrap_or(true)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
