//! The collection contract shared by every store backend.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access collection file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize collection: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A record addressable by a numeric primary key.
pub trait Document: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
}

/// A named set of documents with upsert/delete/scan semantics.
#[async_trait]
pub trait Collection<T: Document>: Send + Sync {
    /// Inserts the record or replaces the one with the same id.
    async fn upsert(&self, record: T) -> Result<(), StoreError>;

    /// Deletes the record with `id`. Returns whether one existed.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Returns every record, ordered by id.
    async fn all(&self) -> Result<Vec<T>, StoreError>;

    /// Removes every record.
    async fn drop_all(&self) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
