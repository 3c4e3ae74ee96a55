//! Schema normalization: rewrites every authoring shorthand into one
//! canonical internal shape.
//!
//! Handled here:
//! - bare-string field shorthand (`"name": "string"`) into full definitions
//! - `visibility` flags into explicit `show_in` sets and concrete
//!   `listable`/`editable`/`viewable`/`filterable` booleans
//! - lookup model-name shorthand into structured lookup specs
//! - boolean-field UI shorthand into explicit on/off label + icon specs
//! - relationship `model`/`related_table` defaulting
//!
//! Normalization is idempotent: running it on an already-normalized
//! schema is a no-op.

use crate::schema::types::{
    BooleanUi, BooleanUiEntry, FieldDefinition, FieldEntry, FieldType, LookupEntry, LookupSpec,
    Schema, SchemaError, SchemaResult, ShowIn,
};

/// Canonicalizes schema documents.
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Produce the canonical form of `schema`.
    pub fn normalize(mut schema: Schema) -> SchemaResult<Schema> {
        let mut fields = indexmap::IndexMap::with_capacity(schema.fields.len());
        for (name, entry) in schema.fields {
            let def = match entry {
                FieldEntry::Shorthand(type_name) => {
                    let field_type = FieldType::from_name(&type_name).ok_or_else(|| {
                        SchemaError::Validation(format!(
                            "field '{}' declares unknown type '{}'",
                            name, type_name
                        ))
                    })?;
                    FieldDefinition::of_type(field_type)
                }
                FieldEntry::Definition(def) => *def,
            };
            fields.insert(name, FieldEntry::Definition(Box::new(Self::normalize_field(def))));
        }
        schema.fields = fields;

        for rel in &mut schema.relationships {
            if rel.model.is_none() {
                rel.model = Some(rel.name.clone());
            }
            if rel.related_table.is_none() {
                rel.related_table = rel.model.clone();
            }
        }

        Ok(schema)
    }

    fn normalize_field(mut def: FieldDefinition) -> FieldDefinition {
        // Visibility shorthand expands to a show_in set, which then
        // drives the projection booleans unless they were explicit.
        let show_in = match def.visibility.take() {
            Some(visibility) => Some(ShowIn::from_visibility(&visibility)),
            None => def.show_in,
        };

        match show_in {
            Some(show_in) => {
                def.show_in = Some(show_in);
                if def.listable.is_none() {
                    def.listable = Some(show_in.list);
                }
                if def.editable.is_none() {
                    def.editable = Some(show_in.form && !def.readonly);
                }
                if def.viewable.is_none() {
                    def.viewable = Some(show_in.detail);
                }
            }
            None => {
                if def.listable.is_none() {
                    def.listable = Some(true);
                }
                if def.editable.is_none() {
                    def.editable = Some(!def.readonly);
                }
                if def.viewable.is_none() {
                    def.viewable = Some(true);
                }
                def.show_in = Some(ShowIn {
                    list: def.listable.unwrap_or(false),
                    form: def.editable.unwrap_or(false),
                    detail: def.viewable.unwrap_or(false),
                });
            }
        }

        if def.filterable.is_none() {
            def.filterable = Some(false);
        }

        def.lookup = def.lookup.take().map(|lookup| match lookup {
            LookupEntry::Model(model) => LookupEntry::Spec(LookupSpec {
                model,
                value_field: "id".to_string(),
                label_field: "name".to_string(),
            }),
            spec @ LookupEntry::Spec(_) => spec,
        });

        def.boolean_ui = match (def.field_type, def.boolean_ui.take()) {
            // Boolean fields always end up with an explicit on/off spec
            // unless the author opted out with `false`, which is kept
            // as-is so re-normalization cannot resurrect the spec.
            (FieldType::Boolean, None) => Some(BooleanUiEntry::Spec(BooleanUi::default())),
            (FieldType::Boolean, Some(BooleanUiEntry::Flag(true))) => {
                Some(BooleanUiEntry::Spec(BooleanUi::default()))
            }
            (FieldType::Boolean, Some(opt_out @ BooleanUiEntry::Flag(false))) => Some(opt_out),
            (FieldType::Boolean, Some(spec @ BooleanUiEntry::Spec(_))) => Some(spec),
            // UI hints on non-boolean fields are authoring noise.
            (_, _) => None,
        };

        def
    }
}
