//! The schema service: the single entry point the rest of the engine
//! (and external callers) use to resolve schemas.
//!
//! Resolution order is cache → load → validate → normalize → cache.
//! Validation happens before normalization and caching so a malformed
//! document is never cached in either tier.

use crate::db_operations::DbOperations;
use crate::error::TableFoldResult;
use crate::model::DynamicModel;
use crate::schema::cache::{SchemaCache, SchemaCacheKey};
use crate::schema::filter::SchemaFilter;
use crate::schema::loader::SchemaLoader;
use crate::schema::normalizer::SchemaNormalizer;
use crate::schema::translator::{SchemaTranslator, TranslationProvider};
use crate::schema::types::{FieldType, Schema, SchemaResult};
use crate::schema::validator::SchemaValidator;
use indexmap::IndexMap;
use log::{info, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Orchestrates schema loading, validation, normalization and caching.
pub struct SchemaService {
    loader: SchemaLoader,
    cache: SchemaCache,
}

impl SchemaService {
    pub fn new(loader: SchemaLoader, cache: SchemaCache) -> Self {
        Self { loader, cache }
    }

    /// Resolve the normalized schema for a model on the default
    /// connection.
    pub fn get_schema(&self, model: &str) -> SchemaResult<Schema> {
        self.get_schema_on(model, None)
    }

    /// Resolve the normalized schema for a model, connection-aware.
    ///
    /// A cache hit skips load, validation and normalization entirely.
    pub fn get_schema_on(&self, model: &str, connection: Option<&str>) -> SchemaResult<Schema> {
        let key = SchemaCacheKey::new(model, connection);
        if let Some(schema) = self.cache.get(&key)? {
            return Ok(schema);
        }

        let raw = self.loader.load(model, connection)?;
        SchemaValidator::validate(&raw, model)?;
        let normalized = SchemaNormalizer::normalize(raw)?;

        let version = self.cache.insert(&key, normalized.clone())?;
        info!(
            "Schema '{}' resolved and cached (version {})",
            key.storage_key(),
            version
        );
        Ok(normalized)
    }

    /// Invalidate a single cached schema. No error if absent.
    pub fn clear_cache(&self, model: &str, connection: Option<&str>) -> SchemaResult<()> {
        self.cache.remove(&SchemaCacheKey::new(model, connection))
    }

    /// Invalidate every cached schema.
    pub fn clear_all_cache(&self) -> SchemaResult<()> {
        self.cache.clear()
    }

    /// Cached version for a key, if present in either tier. Mostly
    /// useful for diagnostics and tests.
    pub fn cached_version(&self, model: &str, connection: Option<&str>) -> SchemaResult<Option<u64>> {
        self.cache.version(&SchemaCacheKey::new(model, connection))
    }

    /// Resolve and project a schema for a context request.
    pub fn filter_schema_for_context(
        &self,
        model: &str,
        context: Option<&str>,
        connection: Option<&str>,
    ) -> SchemaResult<Value> {
        let schema = self.get_schema_on(model, connection)?;
        SchemaFilter::filter_for_context(&schema, context)
    }

    /// Resolve and project a schema plus every related schema the
    /// context needs, so one logical page load costs one call.
    ///
    /// Related schemas that fail to resolve are skipped with a warning
    /// rather than failing the primary schema.
    pub fn filter_schema_with_related(
        &self,
        model: &str,
        context: Option<&str>,
        connection: Option<&str>,
    ) -> SchemaResult<Value> {
        let schema = self.get_schema_on(model, connection)?;
        let filtered = SchemaFilter::filter_for_context(&schema, context)?;

        let mut related = Map::new();
        for related_model in SchemaFilter::related_models(&schema, context)? {
            match self.filter_schema_for_context(&related_model, context, connection) {
                Ok(doc) => {
                    related.insert(related_model, doc);
                }
                Err(e) => {
                    warn!(
                        "Skipping related schema '{}' for '{}': {}",
                        related_model, model, e
                    );
                }
            }
        }

        Ok(json!({ "schema": filtered, "related": related }))
    }

    /// Resolve a schema and translate its embedded translation keys.
    pub fn translated_schema(
        &self,
        model: &str,
        connection: Option<&str>,
        provider: &dyn TranslationProvider,
    ) -> SchemaResult<Schema> {
        let schema = self.get_schema_on(model, connection)?;
        SchemaTranslator::new(provider).translate_schema(&schema)
    }

    /// Project a normalized schema into the field → rule-list shape the
    /// external request validator consumes.
    pub fn validation_rules(
        schema: &Schema,
        for_update: bool,
    ) -> SchemaResult<IndexMap<String, Vec<String>>> {
        let writable = schema.writable_columns();
        let mut rules = IndexMap::new();
        for (name, def) in schema.field_definitions()? {
            if !writable.iter().any(|column| column == name) {
                continue;
            }

            let mut field_rules = Vec::new();
            if def.required && !for_update {
                field_rules.push("required".to_string());
            }
            field_rules.push(Self::type_rule(def.field_type).to_string());

            match &def.validation {
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Value::String(rule) = item {
                            field_rules.push(rule.clone());
                        }
                    }
                }
                Some(Value::String(piped)) => {
                    field_rules.extend(piped.split('|').map(str::to_string));
                }
                _ => {}
            }

            rules.insert(name.to_string(), field_rules);
        }
        Ok(rules)
    }

    fn type_rule(field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::String | FieldType::Text | FieldType::Password => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Date | FieldType::DateTime => "date",
            FieldType::Json => "array",
            FieldType::Float | FieldType::Decimal => "numeric",
            FieldType::Email => "email",
        }
    }

    /// Configure a disposable data-access object for a model.
    pub fn model_instance(
        &self,
        model: &str,
        db: Arc<DbOperations>,
    ) -> TableFoldResult<DynamicModel> {
        let schema = self.get_schema(model)?;
        DynamicModel::from_schema(db, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::SchemaError;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn service_with(docs: &[(&str, Value)]) -> (SchemaService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        for (name, doc) in docs {
            fs::write(
                dir.path().join(format!("{}.json", name)),
                doc.to_string(),
            )
            .unwrap();
        }
        let service = SchemaService::new(
            SchemaLoader::new(dir.path()),
            SchemaCache::local_only(),
        );
        (service, dir)
    }

    fn orders_doc() -> Value {
        json!({
            "model": "orders",
            "table": "orders",
            "fields": {
                "id": {"type": "integer", "readonly": true},
                "status": {"type": "string", "required": true, "validation": ["max:32"]},
                "total": {"type": "decimal"}
            }
        })
    }

    #[test]
    fn resolves_and_normalizes() {
        let (service, _dir) = service_with(&[("orders", orders_doc())]);
        let schema = service.get_schema("orders").unwrap();
        assert_eq!(schema.model, "orders");
        // Normalization ran: projection flags are concrete.
        let defs = schema.field_definitions().unwrap();
        assert!(defs.iter().all(|(_, def)| def.listable.is_some()));
    }

    #[test]
    fn model_match_is_enforced() {
        // File name says invoices, document says orders.
        let (service, _dir) = service_with(&[("invoices", orders_doc())]);
        let err = service.get_schema("invoices").unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
        // Nothing was cached for the bad document.
        assert_eq!(service.cached_version("invoices", None).unwrap(), None);
    }

    #[test]
    fn missing_schema_is_not_found() {
        let (service, _dir) = service_with(&[]);
        assert!(matches!(
            service.get_schema("ghosts").unwrap_err(),
            SchemaError::NotFound(_)
        ));
    }

    #[test]
    fn cache_hit_skips_reload() {
        let (service, dir) = service_with(&[("orders", orders_doc())]);
        service.get_schema("orders").unwrap();

        // Remove the file; the cached schema still resolves.
        fs::remove_file(dir.path().join("orders.json")).unwrap();
        assert!(service.get_schema("orders").is_ok());

        // After invalidation the loader runs again and misses.
        service.clear_cache("orders", None).unwrap();
        assert!(matches!(
            service.get_schema("orders").unwrap_err(),
            SchemaError::NotFound(_)
        ));
    }

    #[test]
    fn clear_all_cache_invalidates_everything() {
        let (service, dir) = service_with(&[("orders", orders_doc())]);
        service.get_schema("orders").unwrap();
        fs::remove_file(dir.path().join("orders.json")).unwrap();

        service.clear_all_cache().unwrap();
        assert!(service.get_schema("orders").is_err());
    }

    #[test]
    fn validation_rules_projection() {
        let (service, _dir) = service_with(&[("orders", orders_doc())]);
        let schema = service.get_schema("orders").unwrap();

        let rules = SchemaService::validation_rules(&schema, false).unwrap();
        assert!(rules.get("id").is_none());
        assert_eq!(
            rules.get("status").unwrap(),
            &["required", "string", "max:32"]
        );
        assert_eq!(rules.get("total").unwrap(), &["numeric"]);

        // Updates drop the required rule.
        let update_rules = SchemaService::validation_rules(&schema, true).unwrap();
        assert_eq!(update_rules.get("status").unwrap(), &["string", "max:32"]);
    }
}
