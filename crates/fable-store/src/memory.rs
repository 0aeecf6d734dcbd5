use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::{Record, Store, StoreError};

/// In-memory store.
///
/// Suitable for single-process use or testing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  collections: Mutex<HashMap<String, Vec<Record>>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Record>>> {
    self
      .collections
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[async_trait]
impl Store for InMemoryStore {
  async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError> {
    let mut collections = self.lock();
    let records = collections.entry(collection.to_string()).or_default();

    match records.iter_mut().find(|r| r.key == key) {
      Some(existing) => existing.value = value.clone(),
      None => records.push(Record {
        key: key.to_string(),
        value: value.clone(),
        created_at: Utc::now(),
      }),
    }
    Ok(())
  }

  async fn get(&self, collection: &str, key: &str) -> Result<Value, StoreError> {
    self
      .lock()
      .get(collection)
      .and_then(|records| records.iter().find(|r| r.key == key))
      .map(|r| r.value.clone())
      .ok_or_else(|| StoreError::NotFound {
        collection: collection.to_string(),
        key: key.to_string(),
      })
  }

  async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
    Ok(self.lock().get(collection).cloned().unwrap_or_default())
  }
}
