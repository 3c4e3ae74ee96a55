//! Field definitions and the field-level authoring shorthands.
//!
//! A schema author can write a field as a bare type string
//! (`"name": "string"`), as a partially specified object, or as a
//! fully explicit definition. The normalizer rewrites all of these
//! into the explicit form; the types here accept every spelling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed set of column types a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Date,
    DateTime,
    Text,
    Json,
    Float,
    Decimal,
    Email,
    Password,
}

impl FieldType {
    /// Parse a type name as it appears in a schema document.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::DateTime),
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "float" => Some(Self::Float),
            "decimal" => Some(Self::Decimal),
            "email" => Some(Self::Email),
            "password" => Some(Self::Password),
            _ => None,
        }
    }

    /// Name used on the wire and in validation-rule projections.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Text => "text",
            Self::Json => "json",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Email => "email",
            Self::Password => "password",
        }
    }
}

/// One entry in a schema's `fields` map: either the bare-string type
/// shorthand or a full definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Shorthand(String),
    Definition(Box<FieldDefinition>),
}

impl FieldEntry {
    /// The full definition, if this entry has been normalized.
    pub fn definition(&self) -> Option<&FieldDefinition> {
        match self {
            Self::Definition(def) => Some(def),
            Self::Shorthand(_) => None,
        }
    }
}

/// Which contexts a field appears in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowIn {
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub form: bool,
    #[serde(default)]
    pub detail: bool,
}

impl ShowIn {
    /// Parse a `visibility` shorthand: `"all"` or a comma-separated
    /// subset of `list`, `form`, `detail`. Unknown names are ignored.
    pub fn from_visibility(visibility: &str) -> Self {
        if visibility.trim() == "all" {
            return Self {
                list: true,
                form: true,
                detail: true,
            };
        }
        let mut show_in = Self::default();
        for part in visibility.split(',') {
            match part.trim() {
                "list" => show_in.list = true,
                "form" => show_in.form = true,
                "detail" => show_in.detail = true,
                _ => {}
            }
        }
        show_in
    }
}

/// Lookup source for reference fields: bare model-name shorthand or a
/// structured spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupEntry {
    Model(String),
    Spec(LookupSpec),
}

impl LookupEntry {
    /// The referenced model name, whichever spelling was used.
    pub fn model(&self) -> &str {
        match self {
            Self::Model(model) => model,
            Self::Spec(spec) => &spec.model,
        }
    }
}

/// Structured lookup descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSpec {
    pub model: String,
    #[serde(default = "default_lookup_value_field")]
    pub value_field: String,
    #[serde(default = "default_lookup_label_field")]
    pub label_field: String,
}

fn default_lookup_value_field() -> String {
    "id".to_string()
}

fn default_lookup_label_field() -> String {
    "name".to_string()
}

/// Boolean-field UI hint: `true` shorthand or explicit on/off spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BooleanUiEntry {
    Flag(bool),
    Spec(BooleanUi),
}

/// Explicit on/off presentation for boolean fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanUi {
    #[serde(default = "default_on_label")]
    pub on_label: String,
    #[serde(default = "default_off_label")]
    pub off_label: String,
    #[serde(default = "default_on_icon")]
    pub on_icon: String,
    #[serde(default = "default_off_icon")]
    pub off_icon: String,
}

impl Default for BooleanUi {
    fn default() -> Self {
        Self {
            on_label: default_on_label(),
            off_label: default_off_label(),
            on_icon: default_on_icon(),
            off_icon: default_off_icon(),
        }
    }
}

fn default_on_label() -> String {
    "common.on".to_string()
}

fn default_off_label() -> String {
    "common.off".to_string()
}

fn default_on_icon() -> String {
    "check".to_string()
}

fn default_off_icon() -> String {
    "close".to_string()
}

/// A fully specified schema field.
///
/// Before normalization the projection flags (`listable`, `editable`,
/// `viewable`, `filterable`) may be absent; afterwards they are always
/// concrete. `visibility` is consumed by normalization into `show_in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub sortable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in: Option<ShowIn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_ui: Option<BooleanUiEntry>,
}

impl FieldDefinition {
    /// Minimal definition carrying only a type, as produced from the
    /// bare-string shorthand.
    pub fn of_type(field_type: FieldType) -> Self {
        Self {
            field_type,
            label: None,
            required: false,
            readonly: false,
            sortable: false,
            filterable: None,
            listable: None,
            editable: None,
            viewable: None,
            visibility: None,
            show_in: None,
            validation: None,
            lookup: None,
            boolean_ui: None,
        }
    }

    pub fn is_listable(&self) -> bool {
        self.listable.unwrap_or(false)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.unwrap_or(false)
    }

    pub fn is_viewable(&self) -> bool {
        self.viewable.unwrap_or(false)
    }
}
