//! Engine configuration.
//!
//! A TOML document naming the schemas directory, the database path and
//! the cache behavior. Missing sections fall back to defaults.

use crate::error::{TableFoldError, TableFoldResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the schema JSON documents, with optional
    /// per-connection subdirectories.
    pub schemas_dir: PathBuf,

    /// Path of the sled keyspace.
    pub database_path: PathBuf,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Schema-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the shared persistent tier is used at all.
    #[serde(default = "default_shared_enabled")]
    pub shared_enabled: bool,

    /// TTL for shared-tier entries, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shared_enabled: default_shared_enabled(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_shared_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    3600
}

impl EngineConfig {
    pub fn new<S: AsRef<Path>, D: AsRef<Path>>(schemas_dir: S, database_path: D) -> Self {
        Self {
            schemas_dir: schemas_dir.as_ref().to_path_buf(),
            database_path: database_path.as_ref().to_path_buf(),
            cache: CacheConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> TableFoldResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| TableFoldError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> TableFoldResult<()> {
        if self.schemas_dir.as_os_str().is_empty() {
            return Err(TableFoldError::Config(
                "schemas_dir must not be empty".to_string(),
            ));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(TableFoldError::Config(
                "database_path must not be empty".to_string(),
            ));
        }
        if self.cache.shared_enabled && self.cache.ttl_secs == 0 {
            return Err(TableFoldError::Config(
                "cache.ttl_secs must be positive when the shared tier is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
