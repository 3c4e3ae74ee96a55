//! The main engine coordinator.

use crate::config::EngineConfig;
use crate::db_operations::{DbOperations, Row, Transaction};
use crate::error::{TableFoldError, TableFoldResult};
use crate::model::relationship::cascade::CascadeDeleteEngine;
use crate::model::relationship::processor::RelationshipActionProcessor;
use crate::model::relationship::query::{ListingParams, RelationshipListing};
use crate::model::{DynamicModel, RequestContext};
use crate::schema::cache::{SchemaCache, SledCacheStore};
use crate::schema::types::{LifecycleEvent, SchemaError};
use crate::schema::{SchemaLoader, SchemaService};
use log::info;
use serde_json::Value;
use std::sync::Arc;

/// The central coordinator for schema-driven table access.
///
/// TableFold owns the sled keyspace and the schema service, and
/// sequences every write operation: primary row write, relationship
/// actions and cascade deletes all stage into one transaction that is
/// committed once, or dropped whole on the first error.
pub struct TableFold {
    db: Arc<DbOperations>,
    schema_service: Arc<SchemaService>,
}

impl TableFold {
    /// Build an engine from configuration. The shared schema-cache
    /// tier lives in the same sled keyspace as the row data when
    /// enabled.
    pub fn new(config: EngineConfig) -> TableFoldResult<Self> {
        config.validate()?;

        let db = Arc::new(DbOperations::open(&config.database_path)?);
        let cache = if config.cache.shared_enabled {
            let store = Arc::new(SledCacheStore::new(db.db())?);
            SchemaCache::with_shared(store, config.cache.ttl_secs as i64)
        } else {
            SchemaCache::local_only()
        };

        let schema_service = Arc::new(SchemaService::new(
            SchemaLoader::new(&config.schemas_dir),
            cache,
        ));

        info!(
            "TableFold engine ready (schemas: {}, database: {})",
            config.schemas_dir.display(),
            config.database_path.display()
        );
        Ok(Self { db, schema_service })
    }

    pub fn schema_service(&self) -> &SchemaService {
        &self.schema_service
    }

    pub fn db_operations(&self) -> Arc<DbOperations> {
        self.db.clone()
    }

    /// A fresh data-access object configured for `model`.
    pub fn model(&self, model: &str) -> TableFoldResult<DynamicModel> {
        self.schema_service.model_instance(model, self.db.clone())
    }

    /// Create a record, then run the schema's `on_create` relationship
    /// actions, all in one transaction.
    pub fn create_record(
        &self,
        model: &str,
        data: Row,
        ctx: &RequestContext,
    ) -> TableFoldResult<Row> {
        let model = self.model(model)?;
        let mut tx = Transaction::new();

        let row = model.create(&mut tx, &data)?;
        RelationshipActionProcessor::new(ctx).process(
            &mut tx,
            &model,
            LifecycleEvent::OnCreate,
            &row,
            &data,
        )?;

        self.db.commit(tx)?;
        Ok(row)
    }

    /// Update a record, then run `on_update` relationship actions
    /// (including sync), all in one transaction.
    pub fn update_record(
        &self,
        model: &str,
        id: &Value,
        data: Row,
        ctx: &RequestContext,
    ) -> TableFoldResult<Row> {
        let model = self.model(model)?;
        let mut tx = Transaction::new();

        let row = model.update(&mut tx, id, &data)?;
        RelationshipActionProcessor::new(ctx).process(
            &mut tx,
            &model,
            LifecycleEvent::OnUpdate,
            &row,
            &data,
        )?;

        self.db.commit(tx)?;
        Ok(row)
    }

    /// Delete a record. Cascade deletion of declared children runs
    /// first, then `on_delete` relationship actions, then the parent
    /// row itself (soft or hard as the caller chose), all in one
    /// transaction.
    ///
    /// Returns `false` when the record does not exist (or is already
    /// soft-deleted).
    pub fn delete_record(
        &self,
        model: &str,
        id: &Value,
        soft: bool,
        ctx: &RequestContext,
    ) -> TableFoldResult<bool> {
        let model = self.model(model)?;
        let Some(row) = model.find(None, id)? else {
            return Ok(false);
        };

        if soft && !model.supports_soft_delete() {
            return Err(TableFoldError::from(SchemaError::Validation(format!(
                "model '{}' does not support soft delete",
                model.schema().model
            ))));
        }

        let mut tx = Transaction::new();

        CascadeDeleteEngine::new(&self.schema_service, self.db.clone()).cascade(
            &mut tx,
            model.schema(),
            &row,
            soft,
        )?;

        RelationshipActionProcessor::new(ctx).process(
            &mut tx,
            &model,
            LifecycleEvent::OnDelete,
            &row,
            &Row::new(),
        )?;

        if soft {
            model.soft_delete(&mut tx, id)?;
        } else {
            model.delete(&mut tx, id)?;
        }

        self.db.commit(tx)?;
        Ok(true)
    }

    /// Fetch a live record.
    pub fn get_record(&self, model: &str, id: &Value) -> TableFoldResult<Option<Row>> {
        self.model(model)?.find(None, id)
    }

    /// All live records of a model.
    pub fn list_records(&self, model: &str) -> TableFoldResult<Vec<Row>> {
        self.model(model)?.list(None)
    }

    /// A paginated relationship listing for one parent record.
    pub fn relationship_listing(
        &self,
        model: &str,
        id: &Value,
        relationship: &str,
        params: &ListingParams,
    ) -> TableFoldResult<RelationshipListing> {
        let model = self.model(model)?;
        model.relationship(relationship)?.list(None, id, params)
    }
}
