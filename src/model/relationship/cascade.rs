//! Cascade deletion of declared child tables.
//!
//! Runs inside the parent delete's transaction, before the parent row
//! itself is touched. Every failure propagates so the whole delete
//! (parent and any already-staged children) is discarded, never
//! leaving orphaned foreign-key references behind.

use crate::db_operations::{DbOperations, Row, Transaction};
use crate::error::{TableFoldError, TableFoldResult};
use crate::model::dynamic_model::DynamicModel;
use crate::schema::types::{CascadeMode, Schema};
use crate::schema::SchemaService;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;

/// Walks a schema's `details` declarations and stages the deletion of
/// dependent child rows.
pub struct CascadeDeleteEngine<'a> {
    service: &'a SchemaService,
    db: Arc<DbOperations>,
}

impl<'a> CascadeDeleteEngine<'a> {
    pub fn new(service: &'a SchemaService, db: Arc<DbOperations>) -> Self {
        Self { service, db }
    }

    /// Cascade the deletion of `parent_row`. `parent_soft` says whether
    /// the parent is being soft-deleted; a child is soft-deleted only
    /// when the parent delete is soft, the child supports it, and the
    /// declaration doesn't force hard mode.
    pub fn cascade(
        &self,
        tx: &mut Transaction,
        schema: &Schema,
        parent_row: &Row,
        parent_soft: bool,
    ) -> TableFoldResult<()> {
        let parent_id = parent_row.get(&schema.primary_key).cloned().ok_or_else(|| {
            TableFoldError::InvalidData(format!(
                "parent row of '{}' is missing primary key '{}'",
                schema.model, schema.primary_key
            ))
        })?;

        for detail in &schema.details {
            if !detail.cascade_delete {
                continue;
            }
            self.cascade_child(tx, schema, detail.model.as_str(), &detail.foreign_key, detail.cascade_delete_mode, &parent_id, parent_soft)
                .map_err(|e| {
                    let wrapped = TableFoldError::CascadeDelete {
                        model: schema.model.clone(),
                        child: detail.model.clone(),
                        record: DbOperations::encode_key(&parent_id),
                        source: Box::new(e),
                    };
                    error!("{}", wrapped);
                    wrapped
                })?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn cascade_child(
        &self,
        tx: &mut Transaction,
        parent_schema: &Schema,
        child_model_name: &str,
        foreign_key: &str,
        mode: CascadeMode,
        parent_id: &Value,
        parent_soft: bool,
    ) -> TableFoldResult<()> {
        let child_schema = self.service.get_schema(child_model_name)?;
        let child_model = DynamicModel::from_schema(self.db.clone(), child_schema)?;

        let children: Vec<Row> = self
            .db
            .scan_table(Some(&*tx), child_model.table())?
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| row.get(foreign_key) == Some(parent_id))
            .collect();

        let soft = parent_soft && child_model.supports_soft_delete() && mode != CascadeMode::Hard;
        info!(
            "Cascading {} delete of {} '{}' rows for {} {}",
            if soft { "soft" } else { "hard" },
            children.len(),
            child_model_name,
            parent_schema.model,
            DbOperations::encode_key(parent_id)
        );

        for child_row in children {
            let child_id = child_model.id_of(&child_row)?;
            if soft {
                child_model.soft_delete(tx, &child_id)?;
            } else {
                child_model.delete(tx, &child_id)?;
            }
        }

        Ok(())
    }
}
