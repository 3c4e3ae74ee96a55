//! Recursive translation-key resolution.
//!
//! Schema documents embed human-facing strings as translation keys
//! (`"orders.title"`, `"common.actions.delete"`). The translator walks
//! a document, resolves every key-shaped string through a provider,
//! and leaves everything else untouched.

use crate::schema::types::{Schema, SchemaError, SchemaResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Two or more dot-separated lowercase segments.
static TRANSLATION_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_-]+(\.[a-z0-9_-]+)+$").expect("translation key pattern is valid")
});

/// External lookup for translation keys. Returning `None` leaves the
/// key in place.
pub trait TranslationProvider {
    fn translate(&self, key: &str) -> Option<String>;
}

/// Resolves translation keys embedded in schema documents.
pub struct SchemaTranslator<'a> {
    provider: &'a dyn TranslationProvider,
}

impl<'a> SchemaTranslator<'a> {
    pub fn new(provider: &'a dyn TranslationProvider) -> Self {
        Self { provider }
    }

    /// Whether a string looks like a translation key.
    pub fn is_translation_key(value: &str) -> bool {
        TRANSLATION_KEY.is_match(value)
    }

    /// Recursively translate a JSON document. Structure is preserved;
    /// only key-shaped strings the provider resolves are replaced.
    pub fn translate_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) => {
                if Self::is_translation_key(&s) {
                    match self.provider.translate(&s) {
                        Some(translated) => Value::String(translated),
                        None => Value::String(s),
                    }
                } else {
                    Value::String(s)
                }
            }
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.translate_value(item))
                    .collect(),
            ),
            Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(key, val)| (key, self.translate_value(val)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Translate a full schema by round-tripping it through its JSON
    /// representation.
    pub fn translate_schema(&self, schema: &Schema) -> SchemaResult<Schema> {
        let value = serde_json::to_value(schema)?;
        let translated = self.translate_value(value);
        serde_json::from_value(translated).map_err(SchemaError::from)
    }
}
