//! Error types for the `localrag` crate.

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// Document text could not be read (corrupt file, unsupported encoding).
    #[error("Extraction error ({source_file}): {message}")]
    ExtractionError {
        /// The file whose text could not be extracted.
        source_file: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The named collection does not exist.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Chunking was requested with invalid parameters.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether this error came from an external service (embedder, generator or index).
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingError { .. } | Self::GenerationError { .. } | Self::VectorStoreError { .. }
        )
    }

    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn generation(provider: &str, message: impl Into<String>) -> Self {
        Self::GenerationError { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn vector_store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
