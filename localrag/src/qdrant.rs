//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Chunk metadata is stored as the point payload; point ids are fresh
//! UUID v4 strings.
//!
//! # Example
//!
//! ```rust,ignore
//! use localrag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.ensure_collection("docs", 1024).await?;
//! let ids = store.upsert("docs", &records).await?;
//! let results = store.search("docs", &query_embedding, 3).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionStatus as QdrantCollectionStatus, CreateCollectionBuilder, Distance, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{ChunkMetadata, PendingRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, CollectionStatus, ScoredRecord, VectorStore};

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given gRPC URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store with default URL (`http://localhost:6334`).
    pub fn default_url() -> Result<Self> {
        Self::new("http://localhost:6334")
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::vector_store(BACKEND, e.to_string())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    /// Turn a search or info failure into `CollectionNotFound` when the
    /// collection is absent.
    async fn classify_err(&self, name: &str, e: qdrant_client::QdrantError) -> RagError {
        match self.exists(name).await {
            Ok(false) => RagError::CollectionNotFound(name.to_string()),
            _ => Self::map_err(e),
        }
    }

    fn payload(metadata: &ChunkMetadata) -> Result<Payload> {
        let value = serde_json::to_value(metadata).map_err(|e| {
            RagError::vector_store(BACKEND, format!("failed to encode payload: {e}"))
        })?;
        Payload::try_from(value).map_err(Self::map_err)
    }

    fn point_id(options: Option<&PointIdOptions>) -> String {
        match options {
            Some(PointIdOptions::Uuid(s)) => s.clone(),
            Some(PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        }
    }
}

/// Convert a Qdrant payload value into JSON.
fn to_json(value: &QdrantValue) -> serde_json::Value {
    match &value.kind {
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(*i),
        Some(Kind::DoubleValue(d)) => serde_json::Value::from(*d),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
        ),
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.exists(name).await? {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.exists(name).await? {
            return Ok(());
        }
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[PendingRecord]) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let id = Uuid::new_v4().to_string();
            points.push(PointStruct::new(
                id.clone(),
                record.vector.clone(),
                Self::payload(&record.metadata)?,
            ));
            ids.push(id);
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "upserted records to qdrant");
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let response = match self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.classify_err(collection, e).await),
        };

        let mut results = Vec::with_capacity(response.result.len());
        for scored in response.result {
            let id = Self::point_id(
                scored.id.as_ref().and_then(|pid| pid.point_id_options.as_ref()),
            );
            let payload = serde_json::Value::Object(
                scored.payload.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
            );
            match serde_json::from_value::<ChunkMetadata>(payload) {
                Ok(metadata) => results.push(ScoredRecord { id, score: scored.score, metadata }),
                Err(e) => {
                    warn!(collection, point_id = %id, error = %e, "skipping point with foreign payload");
                }
            }
        }
        Ok(results)
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo> {
        let response = match self.client.collection_info(collection).await {
            Ok(response) => response,
            Err(e) => return Err(self.classify_err(collection, e).await),
        };
        let info = response.result.ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;

        let status = match QdrantCollectionStatus::try_from(info.status) {
            Ok(QdrantCollectionStatus::Red) => CollectionStatus::Unavailable("red".to_string()),
            Ok(_) => CollectionStatus::Ready,
            Err(_) => CollectionStatus::Unavailable(format!("unknown status {}", info.status)),
        };

        Ok(CollectionInfo {
            name: collection.to_string(),
            record_count: info.points_count.unwrap_or(0),
            status,
        })
    }

    /// Reachable when the collection list can be read.
    async fn health_check(&self) -> bool {
        match self.client.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                debug!(backend = BACKEND, error = %e, "health check failed");
                false
            }
        }
    }
}
