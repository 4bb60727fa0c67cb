//! RAG pipeline context.
//!
//! The [`RagPipeline`] is the explicitly constructed context object that
//! holds every collaborator: the [`EmbeddingProvider`], the [`VectorStore`],
//! the [`Chunker`], the [`TextExtractor`] and an optional [`Generator`].
//! Build it once at startup and share it by reference (or `Arc`).
//! Ingestion lives in [`crate::ingest`], retrieval and answering in
//! [`crate::retrieval`].
//!
//! # Example
//!
//! ```rust,ignore
//! use localrag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.ensure_collection().await?;
//! pipeline.ingest(&source_document).await?;
//! let answer = pipeline.ask("What is X?", 3).await?;
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{DefaultExtractor, TextExtractor};
use crate::generation::Generator;
use crate::prompt::PromptBuilder;
use crate::vectorstore::{CollectionInfo, CollectionStatus, VectorStore};

/// Reachability of each external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ServiceHealth {
    /// Embedding model endpoint.
    pub embedder: bool,
    /// Vector store.
    pub vector_store: bool,
    /// Generation model endpoint, `None` when no generator is configured.
    pub generator: Option<bool>,
}

impl ServiceHealth {
    /// Whether every configured service is reachable.
    pub fn all_healthy(&self) -> bool {
        self.embedder && self.vector_store && self.generator.unwrap_or(true)
    }
}

/// The RAG pipeline context.
///
/// Coordinates document ingestion (extract → chunk → embed → store) and
/// question answering (embed → search → rank → prompt → generate).
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    pub(crate) config: RagConfig,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) vector_store: Arc<dyn VectorStore>,
    pub(crate) chunker: Arc<dyn Chunker>,
    pub(crate) extractor: Arc<dyn TextExtractor>,
    pub(crate) generator: Option<Arc<dyn Generator>>,
    pub(crate) prompt_builder: PromptBuilder,
    /// Serialises collection writes so a clear never interleaves with an upsert.
    pub(crate) write_guard: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return the configured generator, if any.
    pub fn generator(&self) -> Option<&Arc<dyn Generator>> {
        self.generator.as_ref()
    }

    /// Create the configured collection if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the vector store's error if the collection cannot be created.
    pub async fn ensure_collection(&self) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        self.ensure_collection_locked().await
    }

    pub(crate) async fn ensure_collection_locked(&self) -> Result<()> {
        let name = &self.config.collection;
        self.vector_store
            .ensure_collection(name, self.config.embedding_dimension)
            .await
            .inspect_err(|e| error!(collection = %name, error = %e, "failed to ensure collection"))
    }

    /// Delete every record and recreate the collection empty, with the same
    /// dimension and metric.
    ///
    /// # Errors
    ///
    /// Returns the vector store's error if deletion or recreation fails.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let name = &self.config.collection;
        self.vector_store.clear(name, self.config.embedding_dimension).await.inspect_err(|e| {
            error!(collection = %name, error = %e, "failed to clear collection");
        })?;
        info!(collection = %name, "cleared collection");
        Ok(())
    }

    /// Report the collection's record count and status. Never fails.
    pub async fn collection_info(&self) -> CollectionInfo {
        let name = &self.config.collection;
        match self.vector_store.info(name).await {
            Ok(info) => info,
            Err(RagError::CollectionNotFound(_)) => {
                warn!(collection = %name, "collection info requested for missing collection");
                CollectionInfo {
                    name: name.clone(),
                    record_count: 0,
                    status: CollectionStatus::Missing,
                }
            }
            Err(e) => {
                error!(collection = %name, error = %e, "failed to read collection info");
                CollectionInfo {
                    name: name.clone(),
                    record_count: 0,
                    status: CollectionStatus::Unavailable(e.to_string()),
                }
            }
        }
    }

    /// Probe every external service.
    pub async fn health(&self) -> ServiceHealth {
        let generator = match &self.generator {
            Some(generator) => Some(generator.health_check().await),
            None => None,
        };
        ServiceHealth {
            embedder: self.embedding_provider.health_check().await,
            vector_store: self.vector_store.health_check().await,
            generator,
        }
    }

    pub(crate) fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        let expected = self.config.embedding_dimension;
        if vector.len() != expected {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".to_string(),
                message: format!(
                    "embedding has {} dimensions, expected {expected}",
                    vector.len()
                ),
            });
        }
        Ok(())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The
/// chunker defaults to a [`FixedSizeChunker`] built from the config, the
/// extractor to [`DefaultExtractor`], and the generator is optional
/// (without one, only retrieval is available).
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generator(Arc::new(generator))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
    generator: Option<Arc<dyn Generator>>,
    prompt_builder: PromptBuilder,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the prompt builder.
    pub fn prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the embedding provider's dimension differs from the configured one.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        if embedding_provider.dimensions() != config.embedding_dimension {
            return Err(RagError::ConfigError(format!(
                "embedding provider produces {} dimensions, config expects {}",
                embedding_provider.dimensions(),
                config.embedding_dimension
            )));
        }

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(DefaultExtractor)),
            generator: self.generator,
            prompt_builder: self.prompt_builder,
            write_guard: Mutex::new(()),
        })
    }
}
