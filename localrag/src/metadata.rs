//! Provenance attached to each chunk before it is stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::document::{Chunk, ChunkMetadata, Document, FileType};
use crate::error::{RagError, Result};

/// Builds [`ChunkMetadata`] for the chunks of one document.
///
/// The upload timestamp is captured when [`build`](MetadataBuilder::build)
/// is called; everything else comes from the document.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    source_file: String,
    file_type: FileType,
    document_id: Option<String>,
    extra: HashMap<String, serde_json::Value>,
}

impl MetadataBuilder {
    /// Create a builder for chunks of `source_file`.
    pub fn new(source_file: impl Into<String>, file_type: FileType) -> Self {
        Self {
            source_file: source_file.into(),
            file_type,
            document_id: None,
            extra: HashMap::new(),
        }
    }

    /// Create a builder carrying a document's provenance and caller metadata.
    ///
    /// Documents without a file type are recorded as plain text. Caller
    /// metadata under a reserved key is dropped.
    pub fn for_document(document: &Document) -> Self {
        let mut extra = document.extra.clone();
        ChunkMetadata::strip_reserved(&mut extra);
        Self {
            source_file: document.source_file.clone(),
            file_type: document.file_type.clone().unwrap_or(FileType::PlainText),
            document_id: document.id.clone(),
            extra,
        }
    }

    /// Build metadata for a chunk, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_index >= total_chunks`.
    pub fn build(&self, chunk: &Chunk) -> Result<ChunkMetadata> {
        self.build_at(&chunk.text, chunk.chunk_index, chunk.total_chunks, Utc::now())
    }

    /// Build metadata with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_index >= total_chunks`.
    pub fn build_at(
        &self,
        text: &str,
        chunk_index: usize,
        total_chunks: usize,
        upload_timestamp: DateTime<Utc>,
    ) -> Result<ChunkMetadata> {
        if chunk_index >= total_chunks {
            return Err(RagError::ChunkingError(format!(
                "chunk_index ({chunk_index}) must be less than total_chunks ({total_chunks})"
            )));
        }

        Ok(ChunkMetadata {
            text: text.to_string(),
            source_file: self.source_file.clone(),
            chunk_index,
            total_chunks,
            upload_timestamp,
            file_type: self.file_type.clone(),
            document_id: self.document_id.clone(),
            extra: self.extra.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn copies_provenance_onto_metadata() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let builder = MetadataBuilder::new("guide.pdf", FileType::Pdf);

        let metadata = builder.build_at("chunk text", 1, 3, at).unwrap();

        assert_eq!(metadata.text, "chunk text");
        assert_eq!(metadata.source_file, "guide.pdf");
        assert_eq!(metadata.chunk_index, 1);
        assert_eq!(metadata.total_chunks, 3);
        assert_eq!(metadata.upload_timestamp, at);
        assert_eq!(metadata.file_type, FileType::Pdf);
    }

    #[test]
    fn rejects_index_outside_sibling_count() {
        let builder = MetadataBuilder::new("a.txt", FileType::PlainText);
        assert!(builder.build_at("x", 2, 2, Utc::now()).is_err());
        assert!(builder.build_at("x", 0, 0, Utc::now()).is_err());
    }

    #[test]
    fn document_identity_and_extra_are_carried() {
        let mut extra = HashMap::new();
        extra.insert("lang".to_string(), serde_json::json!("en"));
        let document = Document {
            id: Some("doc-7".into()),
            source_file: "notes".into(),
            file_type: None,
            text: "body".into(),
            extra,
        };
        let chunk = Chunk { text: "body".into(), start_offset: 0, chunk_index: 0, total_chunks: 1 };

        let metadata = MetadataBuilder::for_document(&document).build(&chunk).unwrap();

        assert_eq!(metadata.document_id.as_deref(), Some("doc-7"));
        assert_eq!(metadata.file_type, FileType::PlainText);
        assert_eq!(metadata.extra["lang"], "en");
    }

    #[test]
    fn reserved_extra_keys_cannot_corrupt_the_payload() {
        let mut extra = HashMap::new();
        extra.insert("chunk_index".to_string(), serde_json::json!("intro"));
        extra.insert("text".to_string(), serde_json::json!(42));
        extra.insert("lang".to_string(), serde_json::json!("en"));
        // Assigned directly so `with_extra` filtering is bypassed.
        let document = Document {
            id: None,
            source_file: "notes.txt".into(),
            file_type: Some(FileType::PlainText),
            text: "body".into(),
            extra,
        };
        let chunk = Chunk { text: "body".into(), start_offset: 0, chunk_index: 0, total_chunks: 1 };

        let metadata = MetadataBuilder::for_document(&document).build(&chunk).unwrap();
        let payload = serde_json::to_value(&metadata).unwrap();

        assert_eq!(payload["chunk_index"], 0);
        assert_eq!(payload["text"], "body");
        assert_eq!(payload["lang"], "en");
        let parsed: ChunkMetadata = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed, metadata);
    }
}
