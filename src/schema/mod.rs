//! The schema pipeline: loading, validation, normalization, caching,
//! projection, actions and translation.
//!
//! Callers go through [`service::SchemaService`]; the submodules are
//! the individual pipeline stages it composes.

pub mod action_manager;
pub mod cache;
pub mod filter;
pub mod loader;
pub mod normalizer;
pub mod service;
pub mod translator;
pub mod types;
pub mod validator;

pub use cache::{SchemaCache, SchemaCacheKey, SharedCacheStore, SledCacheStore};
pub use filter::{ContextSpec, SchemaContext, SchemaFilter};
pub use loader::SchemaLoader;
pub use normalizer::SchemaNormalizer;
pub use service::SchemaService;
pub use translator::{SchemaTranslator, TranslationProvider};
pub use types::{Schema, SchemaError, SchemaResult};
pub use validator::SchemaValidator;
