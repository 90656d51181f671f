//! In-memory collection.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Collection, Document, StoreError};

/// A collection that lives only as long as the process.
#[derive(Debug)]
pub struct MemoryCollection<T> {
    records: RwLock<BTreeMap<i64, T>>,
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T> MemoryCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Document> Collection<T> for MemoryCollection<T> {
    async fn upsert(&self, record: T) -> Result<(), StoreError> {
        self.records.write().await.insert(record.id(), record);
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn drop_all(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}
