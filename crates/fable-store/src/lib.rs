//! Fable Store
//!
//! Collection/key record storage for stories, sessions and child profiles.
//! Records are JSON objects; there are no transactional guarantees.
//!
//! Implementations:
//! - [`InMemoryStore`]: process-local, for tests and one-shot runs
//! - [`SqliteStore`]: a single `records` table in SQLite

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection holding generated stories, keyed by story id.
pub const STORIES: &str = "stories";
/// Collection holding one record per request, keyed by a fresh id.
pub const SESSIONS: &str = "sessions";
/// Collection holding child profiles, keyed by child id.
pub const USERS: &str = "users";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("not found: {collection}/{key}")]
  NotFound { collection: String, key: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub key: String,
  pub value: Value,
  /// Set on first insert, kept on overwrite.
  pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
  /// Insert or overwrite the record at `collection`/`key`.
  async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError>;

  /// Get a record's value.
  async fn get(&self, collection: &str, key: &str) -> Result<Value, StoreError>;

  /// List a collection, oldest first.
  async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;
}

/// `get` that maps `NotFound` to `None`.
pub async fn find(
  store: &dyn Store,
  collection: &str,
  key: &str,
) -> Result<Option<Value>, StoreError> {
  match store.get(collection, key).await {
    Ok(value) => Ok(Some(value)),
    Err(StoreError::NotFound { .. }) => Ok(None),
    Err(e) => Err(e),
  }
}
