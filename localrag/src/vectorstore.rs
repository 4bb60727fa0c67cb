//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{ChunkMetadata, PendingRecord};
use crate::error::Result;

/// A stored record returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    /// Identifier assigned at upsert time.
    pub id: String,
    /// Cosine similarity to the query vector.
    pub score: f32,
    /// Stored metadata.
    pub metadata: ChunkMetadata,
}

/// Lifecycle state of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum CollectionStatus {
    /// The collection exists and accepts reads and writes.
    Ready,
    /// The collection does not exist.
    Missing,
    /// The backend could not be queried.
    Unavailable(String),
}

/// Summary of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of stored records.
    pub record_count: u64,
    /// Lifecycle state.
    pub status: CollectionStatus,
}

/// A storage backend for chunk embeddings with cosine similarity search.
///
/// Records are never updated in place: every upserted entry receives a
/// fresh identifier, so ingesting the same text twice stores it twice.
///
/// # Example
///
/// ```rust,ignore
/// use localrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 1024).await?;
/// let ids = store.upsert("docs", &records).await?;
/// let results = store.search("docs", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create a cosine-metric collection if it does not exist. Idempotent.
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a collection and all of its records.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Store records, returning the identifiers assigned to them in input order.
    async fn upsert(&self, collection: &str, records: &[PendingRecord]) -> Result<Vec<String>>;

    /// Return at most `limit` records ordered by descending similarity.
    ///
    /// Fails with [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound)
    /// if the collection does not exist.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>>;

    /// Report record count and status.
    ///
    /// Fails with [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound)
    /// if the collection does not exist.
    async fn info(&self, collection: &str) -> Result<CollectionInfo>;

    /// Delete every record by dropping and recreating the collection.
    async fn clear(&self, collection: &str, dimensions: usize) -> Result<()> {
        self.delete_collection(collection).await?;
        self.ensure_collection(collection, dimensions).await
    }

    /// Whether the backing service is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}
