//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a dependency-free vector
//! store backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and small corpora.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{ChunkRecord, PendingRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, CollectionStatus, ScoredRecord, VectorStore};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    /// Records in insertion order.
    records: Vec<ChunkRecord>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Search results with equal scores are returned in insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use localrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn check_dimensions(expected: usize, actual: usize, what: &str) -> Result<()> {
    if expected != actual {
        return Err(RagError::vector_store(
            BACKEND,
            format!("{what} has {actual} dimensions, collection expects {expected}"),
        ));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, records: Vec::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[PendingRecord]) -> Result<Vec<String>> {
        let mut collections = self.collections.write().await;
        let store = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;

        for record in records {
            check_dimensions(store.dimensions, record.vector.len(), "record vector")?;
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = Uuid::new_v4().to_string();
            store.records.push(ChunkRecord {
                id: id.clone(),
                vector: record.vector.clone(),
                metadata: record.metadata.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self.collections.read().await;
        let store = collections
            .get(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        check_dimensions(store.dimensions, query.len(), "query vector")?;

        let mut scored: Vec<ScoredRecord> = store
            .records
            .iter()
            .map(|record| ScoredRecord {
                id: record.id.clone(),
                score: cosine_similarity(&record.vector, query),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read().await;
        let store = collections
            .get(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        Ok(CollectionInfo {
            name: collection.to_string(),
            record_count: store.records.len() as u64,
            status: CollectionStatus::Ready,
        })
    }
}
