//! Context-specific schema projections.
//!
//! A context is a named view of a normalized schema: `list` keeps the
//! listable fields and strips validation, `form` keeps the editable
//! fields with validation, `detail` keeps the viewable fields, `meta`
//! carries no field data at all. A comma-separated context string
//! produces one combined document with base metadata at the top level
//! and a `contexts` map of per-context field projections.

use crate::schema::action_manager::SchemaActionManager;
use crate::schema::types::{ActionScope, FieldDefinition, Schema, SchemaError, SchemaResult};
use serde_json::{json, Map, Value};

/// A single named projection context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaContext {
    Full,
    List,
    Form,
    Detail,
    Meta,
}

impl SchemaContext {
    pub fn parse(name: &str) -> SchemaResult<Self> {
        match name.trim() {
            "" | "full" => Ok(Self::Full),
            "list" => Ok(Self::List),
            "form" => Ok(Self::Form),
            "detail" => Ok(Self::Detail),
            "meta" => Ok(Self::Meta),
            other => Err(SchemaError::InvalidData(format!(
                "unknown schema context '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::List => "list",
            Self::Form => "form",
            Self::Detail => "detail",
            Self::Meta => "meta",
        }
    }

    fn keeps(&self, def: &FieldDefinition) -> bool {
        match self {
            Self::Full => true,
            Self::List => def.is_listable(),
            Self::Form => def.is_editable(),
            Self::Detail => def.is_viewable(),
            Self::Meta => false,
        }
    }

    /// Validation rules only travel with form projections.
    fn strips_validation(&self) -> bool {
        matches!(self, Self::List | Self::Detail)
    }
}

/// The parsed form of a context request string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSpec {
    Single(SchemaContext),
    Multi(Vec<SchemaContext>),
}

impl ContextSpec {
    /// Parse an optional context string. `None` and `"full"` both mean
    /// the full schema; `"list,form"` requests a combined document.
    pub fn parse(context: Option<&str>) -> SchemaResult<Self> {
        let Some(context) = context else {
            return Ok(Self::Single(SchemaContext::Full));
        };

        if context.contains(',') {
            let mut contexts = Vec::new();
            for part in context.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                contexts.push(SchemaContext::parse(part)?);
            }
            if contexts.is_empty() {
                return Ok(Self::Single(SchemaContext::Full));
            }
            Ok(Self::Multi(contexts))
        } else {
            Ok(Self::Single(SchemaContext::parse(context)?))
        }
    }

    fn contexts(&self) -> Vec<SchemaContext> {
        match self {
            Self::Single(ctx) => vec![*ctx],
            Self::Multi(ctxs) => ctxs.clone(),
        }
    }
}

/// Projects normalized schemas into context-specific views.
pub struct SchemaFilter;

impl SchemaFilter {
    /// Project `schema` for a context request.
    pub fn filter_for_context(schema: &Schema, context: Option<&str>) -> SchemaResult<Value> {
        match ContextSpec::parse(context)? {
            ContextSpec::Single(SchemaContext::Full) => {
                serde_json::to_value(schema).map_err(SchemaError::from)
            }
            ContextSpec::Single(ctx) => {
                let mut doc = Self::base_metadata(schema, ctx)?;
                if ctx != SchemaContext::Meta {
                    doc.insert("fields".to_string(), Self::project_fields(schema, ctx)?);
                }
                Ok(Value::Object(doc))
            }
            ContextSpec::Multi(ctxs) => {
                // Base metadata appears once at the top level; each
                // context entry carries only its field projection.
                let mut doc = Self::base_metadata(schema, SchemaContext::Full)?;
                let mut contexts = Map::new();
                for ctx in ctxs {
                    let entry = if ctx == SchemaContext::Meta {
                        json!({})
                    } else {
                        json!({ "fields": Self::project_fields(schema, ctx)? })
                    };
                    contexts.insert(ctx.name().to_string(), entry);
                }
                doc.insert("contexts".to_string(), Value::Object(contexts));
                Ok(Value::Object(doc))
            }
        }
    }

    fn base_metadata(schema: &Schema, ctx: SchemaContext) -> SchemaResult<Map<String, Value>> {
        let mut doc = Map::new();
        doc.insert("model".to_string(), json!(schema.model));
        doc.insert("table".to_string(), json!(schema.table));
        if let Some(title) = &schema.title {
            doc.insert("title".to_string(), json!(title));
        }
        doc.insert("primary_key".to_string(), json!(schema.primary_key));
        doc.insert("soft_delete".to_string(), json!(schema.soft_delete));
        if !schema.permissions.is_empty() {
            doc.insert(
                "permissions".to_string(),
                serde_json::to_value(&schema.permissions)?,
            );
        }
        if let Some(default_sort) = &schema.default_sort {
            doc.insert("default_sort".to_string(), json!(default_sort));
        }

        let scope = match ctx {
            SchemaContext::List => Some(ActionScope::List),
            SchemaContext::Detail | SchemaContext::Form => Some(ActionScope::Detail),
            SchemaContext::Full | SchemaContext::Meta => None,
        };
        let actions = match scope {
            Some(scope) => SchemaActionManager::actions_for_scope(schema, scope),
            None => SchemaActionManager::effective_actions(schema),
        };
        if !actions.is_empty() {
            doc.insert("actions".to_string(), serde_json::to_value(actions)?);
        }

        Ok(doc)
    }

    fn project_fields(schema: &Schema, ctx: SchemaContext) -> SchemaResult<Value> {
        let mut fields = Map::new();
        for (name, def) in schema.field_definitions()? {
            if !ctx.keeps(def) {
                continue;
            }
            let mut projected = serde_json::to_value(def)?;
            if ctx.strips_validation() {
                if let Value::Object(obj) = &mut projected {
                    obj.remove("validation");
                }
            }
            fields.insert(name.to_string(), projected);
        }
        Ok(Value::Object(fields))
    }

    /// Models a composite context needs schemas for: relationship
    /// targets always, lookup sources for form/detail/full contexts.
    pub fn related_models(schema: &Schema, context: Option<&str>) -> SchemaResult<Vec<String>> {
        let spec = ContextSpec::parse(context)?;
        let contexts = spec.contexts();
        let wants_lookups = contexts.iter().any(|ctx| {
            matches!(
                ctx,
                SchemaContext::Form | SchemaContext::Detail | SchemaContext::Full
            )
        });

        let mut models = Vec::new();
        for rel in &schema.relationships {
            let model = rel.related_model().to_string();
            if !models.contains(&model) {
                models.push(model);
            }
        }
        if wants_lookups {
            for (_, def) in schema.field_definitions()? {
                if let Some(lookup) = &def.lookup {
                    let model = lookup.model().to_string();
                    if !models.contains(&model) {
                        models.push(model);
                    }
                }
            }
        }
        // The schema cannot be its own related schema.
        models.retain(|model| model != &schema.model);
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalizer::SchemaNormalizer;
    use serde_json::json;

    fn users() -> Schema {
        let schema: Schema = serde_json::from_value(json!({
            "model": "users",
            "table": "users",
            "fields": {
                "id": {"type": "integer", "listable": true, "editable": false},
                "name": {"type": "string", "listable": true, "editable": true,
                         "validation": ["max:190"]},
                "password": {"type": "password", "listable": false, "editable": true,
                             "validation": ["min:12"]}
            }
        }))
        .unwrap();
        SchemaNormalizer::normalize(schema).unwrap()
    }

    fn field_names(doc: &Value, pointer: &str) -> Vec<String> {
        doc.pointer(pointer)
            .and_then(Value::as_object)
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn none_and_full_return_the_whole_schema() {
        let schema = users();
        let full = SchemaFilter::filter_for_context(&schema, None).unwrap();
        assert_eq!(full, serde_json::to_value(&schema).unwrap());
        let explicit = SchemaFilter::filter_for_context(&schema, Some("full")).unwrap();
        assert_eq!(explicit, full);
    }

    #[test]
    fn list_keeps_listable_and_strips_validation() {
        let schema = users();
        let doc = SchemaFilter::filter_for_context(&schema, Some("list")).unwrap();
        assert_eq!(field_names(&doc, "/fields"), ["id", "name"]);
        assert!(doc.pointer("/fields/name/validation").is_none());
    }

    #[test]
    fn form_keeps_editable_and_retains_validation() {
        let schema = users();
        let doc = SchemaFilter::filter_for_context(&schema, Some("form")).unwrap();
        assert_eq!(field_names(&doc, "/fields"), ["name", "password"]);
        assert_eq!(
            doc.pointer("/fields/name/validation").unwrap(),
            &json!(["max:190"])
        );
    }

    #[test]
    fn meta_has_no_field_data() {
        let schema = users();
        let doc = SchemaFilter::filter_for_context(&schema, Some("meta")).unwrap();
        assert!(doc.get("fields").is_none());
        assert_eq!(doc.get("model").unwrap(), "users");
    }

    #[test]
    fn multi_context_partitions_without_duplicating_base() {
        let schema = users();
        let doc = SchemaFilter::filter_for_context(&schema, Some("list,form")).unwrap();

        assert_eq!(field_names(&doc, "/contexts/list/fields"), ["id", "name"]);
        assert_eq!(
            field_names(&doc, "/contexts/form/fields"),
            ["name", "password"]
        );
        // Base metadata only at the top level.
        assert_eq!(doc.get("model").unwrap(), "users");
        assert!(doc.pointer("/contexts/list/model").is_none());
        assert!(doc.pointer("/contexts/form/permissions").is_none());
    }

    #[test]
    fn unknown_context_is_rejected() {
        let schema = users();
        assert!(SchemaFilter::filter_for_context(&schema, Some("grid")).is_err());
    }

    #[test]
    fn related_models_cover_relationships_and_lookups() {
        let schema: Schema = serde_json::from_value(json!({
            "model": "orders",
            "table": "orders",
            "fields": {
                "id": {"type": "integer"},
                "customer_id": {"type": "integer", "lookup": "customers"}
            },
            "relationships": [
                {"name": "items", "type": "many_to_many", "pivot_table": "order_items",
                 "foreign_key": "order_id", "related_key": "item_id"}
            ]
        }))
        .unwrap();
        let schema = SchemaNormalizer::normalize(schema).unwrap();

        let for_form = SchemaFilter::related_models(&schema, Some("form")).unwrap();
        assert_eq!(for_form, ["items", "customers"]);

        // List context does not need lookup sources.
        let for_list = SchemaFilter::related_models(&schema, Some("list")).unwrap();
        assert_eq!(for_list, ["items"]);
    }
}
