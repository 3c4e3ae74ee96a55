//! Action computation: default CRUD actions, toggle normalization and
//! scope filtering.

use crate::schema::types::{ActionDef, ActionKind, ActionScope, Schema};

/// Computes the effective action set for a model.
pub struct SchemaActionManager;

impl SchemaActionManager {
    /// The actions a model exposes: the declared set, normalized, or
    /// the default create/edit/delete triple when nothing is declared.
    pub fn effective_actions(schema: &Schema) -> Vec<ActionDef> {
        let declared = if schema.actions.is_empty() {
            Self::default_actions()
        } else {
            schema.actions.clone()
        };

        declared
            .into_iter()
            .map(|action| Self::normalize_action(schema, action))
            .collect()
    }

    /// The effective actions visible on a given surface.
    pub fn actions_for_scope(schema: &Schema, scope: ActionScope) -> Vec<ActionDef> {
        Self::effective_actions(schema)
            .into_iter()
            .filter(|action| action.scope.includes(scope))
            .collect()
    }

    fn default_actions() -> Vec<ActionDef> {
        vec![
            ActionDef {
                name: "create".to_string(),
                label: None,
                kind: ActionKind::Create,
                scope: ActionScope::List,
                confirm: None,
                permission: None,
                field: None,
            },
            ActionDef {
                name: "edit".to_string(),
                label: None,
                kind: ActionKind::Edit,
                scope: ActionScope::Both,
                confirm: None,
                permission: None,
                field: None,
            },
            ActionDef {
                name: "delete".to_string(),
                label: None,
                kind: ActionKind::Delete,
                scope: ActionScope::Both,
                confirm: Some(true),
                permission: None,
                field: None,
            },
        ]
    }

    fn normalize_action(schema: &Schema, mut action: ActionDef) -> ActionDef {
        // Destructive and toggle-style actions always prompt unless the
        // author said otherwise.
        if action.confirm.is_none()
            && matches!(action.kind, ActionKind::Delete | ActionKind::Toggle)
        {
            action.confirm = Some(true);
        }

        if action.label.is_none() {
            action.label = Some(format!("{}.actions.{}", schema.model, action.name));
        }

        if action.permission.is_none() {
            action.permission = schema.permissions.get(&action.name).cloned();
        }

        action
    }
}
