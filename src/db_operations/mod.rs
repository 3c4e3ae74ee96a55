//! Unified access to the underlying sled keyspace.
//!
//! Every logical table (including pivot tables) maps to one sled tree
//! named `rows:{table}`, with JSON-encoded rows keyed by the canonical
//! string form of their primary key. Writes go through a staged
//! [`Transaction`] so a failing operation leaves the store untouched.

pub mod core;
pub mod transaction;

pub use self::core::DbOperations;
pub use transaction::Transaction;

/// A stored row: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;
