//! Lifecycle relationship actions: attach, sync and detach.
//!
//! Runs after the primary row write (create/update) or before the
//! parent removal (delete), always inside the caller's transaction.
//! Malformed per-instruction configuration (an attach without a
//! `related_id`, a detach that is neither `"all"` nor a list, a sync
//! field that is not an array) is logged and skipped: a half-authored
//! schema must not take writes down. Store failures are different:
//! they propagate so the whole transaction is discarded.

use crate::db_operations::{DbOperations, Row, Transaction};
use crate::error::{TableFoldError, TableFoldResult};
use crate::model::dynamic_model::DynamicModel;
use crate::model::RequestContext;
use crate::schema::types::{
    AttachInstruction, DetachSpec, EventActions, LifecycleEvent, RelationshipDef,
    RelationshipKind,
};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;

/// Executes the relationship actions configured for a lifecycle event.
pub struct RelationshipActionProcessor<'a> {
    ctx: &'a RequestContext,
}

impl<'a> RelationshipActionProcessor<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Process every relationship of `model` for `event`.
    ///
    /// `record` is the written (or about-to-be-deleted) parent row;
    /// `input` is the caller's raw payload, which sync reads its id
    /// lists from.
    pub fn process(
        &self,
        tx: &mut Transaction,
        model: &DynamicModel,
        event: LifecycleEvent,
        record: &Row,
        input: &Row,
    ) -> TableFoldResult<()> {
        let parent_id = model.id_of(record)?;

        for rel in &model.schema().relationships {
            let Some(actions) = rel.actions.for_event(event) else {
                continue;
            };
            self.process_relationship(tx, model, rel, actions, event, &parent_id, input)
                .map_err(|e| {
                    let wrapped = TableFoldError::RelationshipProcessing {
                        model: model.schema().model.clone(),
                        relationship: rel.name.clone(),
                        source: Box::new(e),
                    };
                    error!(
                        "Relationship processing failed ({} on '{}', record {}): {}",
                        event,
                        rel.name,
                        DbOperations::encode_key(&parent_id),
                        wrapped
                    );
                    wrapped
                })?;
        }

        Ok(())
    }

    /// The pivot hop lifecycle mutations operate on: the single pivot
    /// for direct relationships, the first hop for through shapes
    /// (the link the parent owns).
    fn mutation_pivot(kind: &RelationshipKind) -> (&str, &str, &str) {
        match kind {
            RelationshipKind::ManyToMany {
                pivot_table,
                foreign_key,
                related_key,
            } => (pivot_table, foreign_key, related_key),
            RelationshipKind::BelongsToManyThrough {
                first_pivot_table,
                first_foreign_key,
                first_related_key,
                ..
            } => (first_pivot_table, first_foreign_key, first_related_key),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_relationship(
        &self,
        tx: &mut Transaction,
        model: &DynamicModel,
        rel: &RelationshipDef,
        actions: &EventActions,
        event: LifecycleEvent,
        parent_id: &Value,
        input: &Row,
    ) -> TableFoldResult<()> {
        for instruction in &actions.attach {
            self.attach(tx, rel, instruction, parent_id)?;
        }

        if let Some(sync) = &actions.sync {
            if event == LifecycleEvent::OnUpdate {
                let field = sync
                    .field
                    .clone()
                    .unwrap_or_else(|| format!("{}_ids", rel.name));
                self.sync(tx, model, rel, &field, parent_id, input)?;
            } else {
                warn!(
                    "Ignoring sync on '{}' for {}: sync only runs on update",
                    rel.name, event
                );
            }
        }

        if let Some(detach) = &actions.detach {
            self.detach(tx, model, rel, detach, parent_id)?;
        }

        Ok(())
    }

    fn attach(
        &self,
        tx: &mut Transaction,
        rel: &RelationshipDef,
        instruction: &AttachInstruction,
        parent_id: &Value,
    ) -> TableFoldResult<()> {
        let Some(related_id) = &instruction.related_id else {
            warn!(
                "Skipping attach on '{}': instruction has no related_id",
                rel.name
            );
            return Ok(());
        };

        let (pivot_table, foreign_key, related_key) = Self::mutation_pivot(&rel.kind);

        let mut pivot_row = Row::new();
        pivot_row.insert(foreign_key.to_string(), parent_id.clone());
        pivot_row.insert(related_key.to_string(), related_id.clone());
        for (column, value) in &instruction.pivot_data {
            pivot_row.insert(column.clone(), self.resolve_placeholder(value));
        }

        tx.put_encoded(
            pivot_table,
            DbOperations::pivot_key(parent_id, related_id),
            pivot_row,
        );
        info!(
            "Attached {} -> {} via '{}'",
            DbOperations::encode_key(parent_id),
            DbOperations::encode_key(related_id),
            pivot_table
        );
        Ok(())
    }

    fn sync(
        &self,
        tx: &mut Transaction,
        model: &DynamicModel,
        rel: &RelationshipDef,
        field: &str,
        parent_id: &Value,
        input: &Row,
    ) -> TableFoldResult<()> {
        // Absent field: the caller did not send this relationship at
        // all, which is not an error.
        let Some(raw) = input.get(field) else {
            return Ok(());
        };

        let Value::Array(wanted) = raw else {
            warn!(
                "Skipping sync on '{}': input field '{}' is not an id list",
                rel.name, field
            );
            return Ok(());
        };

        let (pivot_table, foreign_key, related_key) = Self::mutation_pivot(&rel.kind);
        let current = Self::current_ids(model.db(), tx, pivot_table, related_key, parent_id)?;

        for stale in current.iter().filter(|id| !wanted.contains(*id)) {
            tx.delete_encoded(pivot_table, DbOperations::pivot_key(parent_id, stale));
        }

        for fresh in wanted.iter().filter(|id| !current.contains(*id)) {
            let mut pivot_row = Row::new();
            pivot_row.insert(foreign_key.to_string(), parent_id.clone());
            pivot_row.insert(related_key.to_string(), fresh.clone());
            tx.put_encoded(
                pivot_table,
                DbOperations::pivot_key(parent_id, fresh),
                pivot_row,
            );
        }

        info!(
            "Synced '{}' for {} to {} ids",
            rel.name,
            DbOperations::encode_key(parent_id),
            wanted.len()
        );
        Ok(())
    }

    fn detach(
        &self,
        tx: &mut Transaction,
        model: &DynamicModel,
        rel: &RelationshipDef,
        spec: &DetachSpec,
        parent_id: &Value,
    ) -> TableFoldResult<()> {
        let (pivot_table, _, related_key) = Self::mutation_pivot(&rel.kind);

        match spec {
            DetachSpec::Keyword(_) if spec.is_all() => {
                let current =
                    Self::current_ids(model.db(), tx, pivot_table, related_key, parent_id)?;
                for id in &current {
                    tx.delete_encoded(pivot_table, DbOperations::pivot_key(parent_id, id));
                }
                info!(
                    "Detached all ({}) from '{}' for {}",
                    current.len(),
                    rel.name,
                    DbOperations::encode_key(parent_id)
                );
            }
            DetachSpec::Ids(ids) => {
                for id in ids {
                    tx.delete_encoded(pivot_table, DbOperations::pivot_key(parent_id, id));
                }
            }
            _ => {
                warn!(
                    "Skipping detach on '{}': expected \"all\" or an id list",
                    rel.name
                );
            }
        }
        Ok(())
    }

    /// The ids currently linked through the mutation pivot, observing
    /// staged transaction state.
    fn current_ids(
        db: &DbOperations,
        tx: &Transaction,
        pivot_table: &str,
        related_key: &str,
        parent_id: &Value,
    ) -> TableFoldResult<Vec<Value>> {
        let prefix = DbOperations::pivot_prefix(parent_id);
        let mut ids = Vec::new();
        for (_, pivot_row) in db.scan_table_prefix(Some(tx), pivot_table, &prefix)? {
            if let Some(id) = pivot_row.get(related_key) {
                ids.push(id.clone());
            }
        }
        Ok(ids)
    }

    /// Resolve pivot-data placeholders at execution time.
    fn resolve_placeholder(&self, value: &Value) -> Value {
        match value.as_str() {
            Some("now") => Value::String(Utc::now().to_rfc3339()),
            Some("current_date") => Value::String(Utc::now().format("%Y-%m-%d").to_string()),
            Some("current_user") => match &self.ctx.user_id {
                Some(user_id) => Value::String(user_id.clone()),
                None => Value::Null,
            },
            _ => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_resolve_at_execution_time() {
        let ctx = RequestContext::for_user("user-42");
        let processor = RelationshipActionProcessor::new(&ctx);

        let now = processor.resolve_placeholder(&json!("now"));
        assert!(now.as_str().unwrap().contains('T'));

        let date = processor.resolve_placeholder(&json!("current_date"));
        assert_eq!(date.as_str().unwrap().len(), 10);

        let user = processor.resolve_placeholder(&json!("current_user"));
        assert_eq!(user, json!("user-42"));

        // Ordinary values pass through.
        assert_eq!(processor.resolve_placeholder(&json!(2)), json!(2));
        assert_eq!(processor.resolve_placeholder(&json!("qty")), json!("qty"));
    }

    #[test]
    fn anonymous_current_user_is_null() {
        let ctx = RequestContext::anonymous();
        let processor = RelationshipActionProcessor::new(&ctx);
        assert_eq!(processor.resolve_placeholder(&json!("current_user")), Value::Null);
    }
}
