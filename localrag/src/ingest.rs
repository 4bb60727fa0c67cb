//! Document ingestion: extract → chunk → embed → attach metadata → upsert.
//!
//! Failures are scoped to one document. A document whose extraction or
//! embedding fails stores nothing; other documents in the same batch are
//! unaffected and their records are kept.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::document::{Document, PendingRecord, SourceDocument};
use crate::error::{RagError, Result};
use crate::metadata::MetadataBuilder;
use crate::pipeline::RagPipeline;

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Chunks were embedded and stored under the returned identifiers.
    Stored {
        /// Identifiers assigned by the vector store, in chunk order.
        ids: Vec<String>,
    },
    /// Extraction succeeded but produced no text; nothing was stored.
    Empty,
}

impl IngestOutcome {
    /// Number of records stored.
    pub fn chunk_count(&self) -> usize {
        match self {
            Self::Stored { ids } => ids.len(),
            Self::Empty => 0,
        }
    }
}

/// Whether an ingestion issue is a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The document produced no text.
    Warning,
    /// The document could not be ingested.
    Error,
}

/// A per-document problem reported in an [`IngestReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestIssue {
    /// The affected file.
    pub source_file: String,
    /// Warning or error.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

/// Combined result of a multi-document ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Number of documents processed.
    pub documents: usize,
    /// Number of documents that stored at least one chunk.
    pub stored_documents: usize,
    /// Total records stored across all documents.
    pub chunk_count: usize,
    /// Warnings and errors, in document order.
    pub issues: Vec<IngestIssue>,
}

impl IngestReport {
    /// Fold one document's result into the report.
    pub fn record(&mut self, source_file: &str, result: &Result<IngestOutcome>) {
        self.documents += 1;
        match result {
            Ok(IngestOutcome::Stored { ids }) => {
                self.stored_documents += 1;
                self.chunk_count += ids.len();
            }
            Ok(IngestOutcome::Empty) => self.issues.push(IngestIssue {
                source_file: source_file.to_string(),
                severity: Severity::Warning,
                message: "no text extracted".to_string(),
            }),
            Err(e) => self.issues.push(IngestIssue {
                source_file: source_file.to_string(),
                severity: Severity::Error,
                message: e.to_string(),
            }),
        }
    }

    /// Whether any document failed outright.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity == Severity::Error)
    }
}

impl RagPipeline {
    /// Ingest an uploaded file: extract its text, then ingest the text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ExtractionError`] if the file cannot be read, or
    /// any error from [`ingest_text`](RagPipeline::ingest_text).
    pub async fn ingest(&self, source: &SourceDocument) -> Result<IngestOutcome> {
        let text = self.extractor.extract(source).inspect_err(|e| {
            error!(source_file = %source.file_name, error = %e, "text extraction failed");
        })?;
        let document = Document::new(source.file_name.clone(), source.file_type.clone(), text);
        self.ingest_text(&document).await
    }

    /// Ingest already-extracted text.
    ///
    /// Every chunk is embedded before anything is written, and all records
    /// of the document go to the vector store in a single upsert, so a
    /// failure leaves the collection untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if embedding fails or returns
    /// vectors of the wrong shape, or the vector store's error if the
    /// upsert fails.
    pub async fn ingest_text(&self, document: &Document) -> Result<IngestOutcome> {
        let source_file = &document.source_file;

        // 1. Chunk the text
        let chunks = self.chunker.chunk(&document.text);
        if chunks.is_empty() {
            warn!(source_file = %source_file, "document has no text, nothing stored");
            return Ok(IngestOutcome::Empty);
        }

        // 2. Embed every chunk, in order
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
            error!(source_file = %source_file, error = %e, "embedding failed during ingestion");
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".to_string(),
                message: format!(
                    "expected {} embeddings for '{source_file}', got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }

        // 3. Attach metadata
        let metadata_builder = MetadataBuilder::for_document(document);
        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| {
                Ok(PendingRecord { vector, metadata: metadata_builder.build(chunk)? })
            })
            .collect::<Result<Vec<_>>>()?;

        // 4. Store all records in one batch
        let ids = {
            let _guard = self.write_guard.lock().await;
            self.ensure_collection_locked().await?;
            self.vector_store.upsert(&self.config.collection, &records).await.inspect_err(|e| {
                error!(source_file = %source_file, error = %e, "upsert failed during ingestion");
            })?
        };

        info!(source_file = %source_file, chunk_count = ids.len(), "ingested document");
        Ok(IngestOutcome::Stored { ids })
    }

    /// Ingest several uploaded files independently.
    ///
    /// A failing document is reported in the returned [`IngestReport`] and
    /// never aborts the rest of the batch.
    pub async fn ingest_batch(&self, sources: &[SourceDocument]) -> IngestReport {
        let mut report = IngestReport::default();
        for source in sources {
            let result = self.ingest(source).await;
            report.record(&source.file_name, &result);
        }
        info!(
            documents = report.documents,
            chunk_count = report.chunk_count,
            issues = report.issues.len(),
            "batch ingestion finished"
        );
        report
    }

    /// Ingest several already-extracted documents independently.
    pub async fn ingest_documents(&self, documents: &[Document]) -> IngestReport {
        let mut report = IngestReport::default();
        for document in documents {
            let result = self.ingest_text(document).await;
            report.record(&document.source_file, &result);
        }
        info!(
            documents = report.documents,
            chunk_count = report.chunk_count,
            issues = report.issues.len(),
            "batch ingestion finished"
        );
        report
    }
}
