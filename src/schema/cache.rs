//! Two-tier schema cache.
//!
//! Lookups check a process-local map first, then an optional shared
//! persistent tier. The shared tier carries a TTL; the local tier
//! lives for the process (logically, the request scope of the host
//! runtime). Writes go through both tiers; invalidation clears both.
//!
//! Shared-tier failures never fail a request: the cache degrades to
//! local-only operation with a warning.
//!
//! Concurrent misses on the same key are not serialized; each caller
//! computes and writes its own entry, last writer wins.

use crate::schema::types::{Schema, SchemaError, SchemaResult};
use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cache key: model name plus optional connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaCacheKey {
    pub model: String,
    pub connection: Option<String>,
}

impl SchemaCacheKey {
    pub fn new(model: &str, connection: Option<&str>) -> Self {
        Self {
            model: model.to_string(),
            connection: connection.map(str::to_string),
        }
    }

    /// Stable string form used as the shared-tier storage key.
    pub fn storage_key(&self) -> String {
        match &self.connection {
            Some(connection) => format!("{}@{}", self.model, connection),
            None => self.model.clone(),
        }
    }
}

/// A cached normalized schema with its version and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSchema {
    pub schema: Schema,
    /// Monotonically increasing per key; bumped on every insert.
    pub version: u64,
    pub cached_at: DateTime<Utc>,
    /// Enforced by the shared tier only.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedSchema {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Backend contract for the shared persistent tier.
pub trait SharedCacheStore: Send + Sync {
    fn get(&self, key: &SchemaCacheKey) -> SchemaResult<Option<CachedSchema>>;
    fn set(&self, key: &SchemaCacheKey, entry: &CachedSchema) -> SchemaResult<()>;
    fn delete(&self, key: &SchemaCacheKey) -> SchemaResult<()>;
    fn clear(&self) -> SchemaResult<()>;
}

/// Shared tier backed by a dedicated sled tree.
pub struct SledCacheStore {
    tree: sled::Tree,
}

impl SledCacheStore {
    pub const TREE_NAME: &'static str = "schema_cache";

    pub fn new(db: &sled::Db) -> SchemaResult<Self> {
        let tree = db
            .open_tree(Self::TREE_NAME)
            .map_err(|e| SchemaError::InvalidData(format!("Failed to open cache tree: {}", e)))?;
        Ok(Self { tree })
    }
}

impl SharedCacheStore for SledCacheStore {
    fn get(&self, key: &SchemaCacheKey) -> SchemaResult<Option<CachedSchema>> {
        match self.tree.get(key.storage_key().as_bytes()) {
            Ok(Some(bytes)) => {
                let entry: CachedSchema = serde_json::from_slice(&bytes).map_err(|e| {
                    SchemaError::InvalidData(format!("Cache entry deserialization failed: {}", e))
                })?;
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SchemaError::InvalidData(format!(
                "Cache retrieval failed: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &SchemaCacheKey, entry: &CachedSchema) -> SchemaResult<()> {
        let bytes = serde_json::to_vec(entry).map_err(|e| {
            SchemaError::InvalidData(format!("Cache entry serialization failed: {}", e))
        })?;
        self.tree
            .insert(key.storage_key().as_bytes(), bytes)
            .map_err(|e| SchemaError::InvalidData(format!("Cache store failed: {}", e)))?;
        self.tree
            .flush()
            .map_err(|e| SchemaError::InvalidData(format!("Cache flush failed: {}", e)))?;
        Ok(())
    }

    fn delete(&self, key: &SchemaCacheKey) -> SchemaResult<()> {
        self.tree
            .remove(key.storage_key().as_bytes())
            .map_err(|e| SchemaError::InvalidData(format!("Cache delete failed: {}", e)))?;
        Ok(())
    }

    fn clear(&self) -> SchemaResult<()> {
        self.tree
            .clear()
            .map_err(|e| SchemaError::InvalidData(format!("Cache clear failed: {}", e)))?;
        Ok(())
    }
}

/// The composed two-tier cache.
pub struct SchemaCache {
    local: Mutex<HashMap<SchemaCacheKey, CachedSchema>>,
    shared: Option<Arc<dyn SharedCacheStore>>,
    ttl: Duration,
}

impl SchemaCache {
    /// Cache with no shared tier: lookups and invalidation touch only
    /// the in-process map.
    pub fn local_only() -> Self {
        Self {
            local: Mutex::new(HashMap::new()),
            shared: None,
            ttl: Duration::seconds(0),
        }
    }

    pub fn with_shared(shared: Arc<dyn SharedCacheStore>, ttl_secs: i64) -> Self {
        Self {
            local: Mutex::new(HashMap::new()),
            shared: Some(shared),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    fn lock_local(&self) -> SchemaResult<std::sync::MutexGuard<'_, HashMap<SchemaCacheKey, CachedSchema>>> {
        self.local
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire cache lock".to_string()))
    }

    /// Read-through lookup: local tier first, then shared; a shared
    /// hit back-fills the local tier.
    pub fn get(&self, key: &SchemaCacheKey) -> SchemaResult<Option<Schema>> {
        if let Some(entry) = self.lock_local()?.get(key) {
            return Ok(Some(entry.schema.clone()));
        }

        let Some(shared) = &self.shared else {
            return Ok(None);
        };

        match shared.get(key) {
            Ok(Some(entry)) => {
                if entry.is_expired(Utc::now()) {
                    // Expired shared entries are treated as misses and
                    // removed opportunistically.
                    if let Err(e) = shared.delete(key) {
                        warn!("Failed to evict expired cache entry '{}': {}", key.storage_key(), e);
                    }
                    return Ok(None);
                }
                let schema = entry.schema.clone();
                self.lock_local()?.insert(key.clone(), entry);
                Ok(Some(schema))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(
                    "Shared schema cache unavailable for '{}', degrading to local tier: {}",
                    key.storage_key(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Write-through insert. Bumps the per-key version past whatever
    /// either tier knew before.
    pub fn insert(&self, key: &SchemaCacheKey, schema: Schema) -> SchemaResult<u64> {
        let now = Utc::now();
        let prior_version = self.current_version(key)?;

        let entry = CachedSchema {
            schema,
            version: prior_version + 1,
            cached_at: now,
            expires_at: self.shared.as_ref().map(|_| now + self.ttl),
        };

        if let Some(shared) = &self.shared {
            if let Err(e) = shared.set(key, &entry) {
                warn!(
                    "Failed to write schema '{}' to shared cache tier: {}",
                    key.storage_key(),
                    e
                );
            }
        }

        let version = entry.version;
        self.lock_local()?.insert(key.clone(), entry);
        Ok(version)
    }

    fn current_version(&self, key: &SchemaCacheKey) -> SchemaResult<u64> {
        if let Some(entry) = self.lock_local()?.get(key) {
            return Ok(entry.version);
        }
        if let Some(shared) = &self.shared {
            if let Ok(Some(entry)) = shared.get(key) {
                return Ok(entry.version);
            }
        }
        Ok(0)
    }

    /// The cached version for a key, if any tier holds it.
    pub fn version(&self, key: &SchemaCacheKey) -> SchemaResult<Option<u64>> {
        if let Some(entry) = self.lock_local()?.get(key) {
            return Ok(Some(entry.version));
        }
        if let Some(shared) = &self.shared {
            if let Ok(Some(entry)) = shared.get(key) {
                return Ok(Some(entry.version));
            }
        }
        Ok(None)
    }

    /// Invalidate one key in both tiers. Absent keys are not an error.
    pub fn remove(&self, key: &SchemaCacheKey) -> SchemaResult<()> {
        self.lock_local()?.remove(key);
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.delete(key) {
                warn!(
                    "Failed to invalidate '{}' in shared cache tier: {}",
                    key.storage_key(),
                    e
                );
            }
        }
        Ok(())
    }

    /// Invalidate everything in both tiers.
    pub fn clear(&self) -> SchemaResult<()> {
        self.lock_local()?.clear();
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.clear() {
                warn!("Failed to clear shared cache tier: {}", e);
            }
        }
        Ok(())
    }
}
