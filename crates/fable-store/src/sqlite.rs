use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{Record, Store, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
  collection TEXT NOT NULL,
  key TEXT NOT NULL,
  value TEXT NOT NULL,
  created_at TEXT NOT NULL,
  PRIMARY KEY (collection, key)
)
"#;

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) a database file and ensure the schema exists.
  pub async fn open(path: &Path) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// A private in-memory database. One connection, so every query sees
  /// the same database.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Create the records table if it does not exist.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::query(SCHEMA).execute(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(value)?;

    sqlx::query(
      r#"
            INSERT INTO records (collection, key, value, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (collection, key) DO UPDATE SET value = excluded.value
            "#,
    )
    .bind(collection)
    .bind(key)
    .bind(encoded)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get(&self, collection: &str, key: &str) -> Result<Value, StoreError> {
    let row: Option<(String,)> = sqlx::query_as(
      r#"
            SELECT value
            FROM records
            WHERE collection = ? AND key = ?
            "#,
    )
    .bind(collection)
    .bind(key)
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some((encoded,)) => Ok(serde_json::from_str(&encoded)?),
      None => Err(StoreError::NotFound {
        collection: collection.to_string(),
        key: key.to_string(),
      }),
    }
  }

  async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
    let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
      r#"
            SELECT key, value, created_at
            FROM records
            WHERE collection = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
    )
    .bind(collection)
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(key, encoded, created_at)| {
        Ok(Record {
          key,
          value: serde_json::from_str(&encoded)?,
          created_at,
        })
      })
      .collect()
  }
}
