//! # localrag
//!
//! Retrieval-augmented generation over a local document corpus.
//!
//! Documents are extracted to text, split into overlapping character
//! windows, embedded, and stored in a vector collection together with
//! their provenance. Questions are embedded, matched against the
//! collection by cosine similarity, and answered by a language model
//! prompted with the best-ranked chunks.
//!
//! The external services sit behind three traits:
//!
//! - [`EmbeddingProvider`]: text to fixed-dimension vector
//! - [`VectorStore`]: store and search vectors with metadata
//! - [`Generator`]: prompt to answer, whole or streamed
//!
//! [`RagPipeline`] wires them together with a [`Chunker`] and a
//! [`TextExtractor`].
//!
//! ## Features
//!
//! - `ollama`: `OllamaEmbedder` and `OllamaGenerator`
//! - `qdrant`: `QdrantVectorStore`
//! - `pdf`: PDF text extraction
//! - `full`: everything above

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod inmemory;
pub mod ingest;
pub mod metadata;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, FixedSizeChunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, ChunkMetadata, ChunkRecord, Document, FileType, Hit, PendingRecord, SourceDocument,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{DefaultExtractor, PlainTextExtractor, TextExtractor};
pub use generation::{FallbackGenerator, Generator, TextStream};
pub use inmemory::InMemoryVectorStore;
pub use ingest::{IngestIssue, IngestOutcome, IngestReport, Severity};
pub use metadata::MetadataBuilder;
pub use pipeline::{RagPipeline, RagPipelineBuilder, ServiceHealth};
pub use prompt::PromptBuilder;
pub use retrieval::{Answer, AnswerStream, rank_hits};
pub use vectorstore::{CollectionInfo, CollectionStatus, ScoredRecord, VectorStore};

#[cfg(feature = "pdf")]
pub use extract::PdfTextExtractor;
