//! JSON-file backed collections.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Collection, Document, StoreError};

/// A directory holding one `<name>.json` file per collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Opens (and creates if needed) the store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Opens a named collection, loading its records if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn collection<T>(&self, name: &str) -> Result<JsonCollection<T>, StoreError>
    where
        T: Document + Serialize + DeserializeOwned,
    {
        JsonCollection::load(self.dir.join(format!("{name}.json")))
    }
}

/// A collection persisted as a JSON array, rewritten on every mutation.
#[derive(Debug)]
pub struct JsonCollection<T> {
    path: PathBuf,
    records: RwLock<BTreeMap<i64, T>>,
}

impl<T> JsonCollection<T>
where
    T: Document + Serialize + DeserializeOwned,
{
    fn load(path: PathBuf) -> Result<Self, StoreError> {
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Vec<T>>(&content)?
                .into_iter()
                .map(|record| (record.id(), record))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    async fn save(&self, records: &BTreeMap<i64, T>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&records.values().collect::<Vec<_>>())?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl<T> Collection<T> for JsonCollection<T>
where
    T: Document + Serialize + DeserializeOwned,
{
    async fn upsert(&self, record: T) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(record.id(), record);
        self.save(&records).await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.remove(&id).is_none() {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn drop_all(&self) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.clear();
        self.save(&records).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}
