use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::record::UserRecord;
use crate::domain::repo::{RecordStore, StoreError};

/// Row store held in memory. Backs `--mock` runs and tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    rows: RwLock<Vec<UserRecord>>,
}

impl InMemoryRecordStore {
    pub fn new(rows: Vec<UserRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Non-object values are dropped.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().filter_map(UserRecord::from_value).collect())
    }

    /// Load rows from a JSON file holding an array of objects.
    pub fn from_fixture(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let values: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("fixture {} is not a JSON array", path.display()))?;
        let store = Self::from_values(values);
        tracing::info!(rows = store.len(), path = %path.display(), "loaded fixture rows");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn scan(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.rows.read().clone())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .find(|r| r.user_id_text().as_deref() == Some(user_id))
            .cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
