//! Checkpoint storage for the strategy engine.
//!
//! This crate provides:
//! - `SQLite` document store (one table per collection, JSON bodies)
//! - In-memory document store for paper runs and tests

pub mod database;
pub mod memory;

pub use database::SqliteDocumentStore;
pub use memory::InMemoryDocumentStore;

use std::sync::Arc;

use short_straddle_core::{DocumentStore, Result};

/// Opens the store selected by a database URL: `memory` for an in-process
/// store, anything else is handed to `SQLite`.
///
/// # Errors
///
/// Returns error if the `SQLite` database cannot be opened.
pub async fn open_store(url: &str) -> Result<Arc<dyn DocumentStore>> {
    if url == "memory" {
        return Ok(Arc::new(InMemoryDocumentStore::new()));
    }
    Ok(Arc::new(SqliteDocumentStore::connect(url).await?))
}
