//! Data types for documents, chunks, stored records and search hits.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of file a document was uploaded as.
///
/// Serialized as a MIME type string so stored metadata stays readable by
/// other tools sharing the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    /// `application/pdf`
    Pdf,
    /// `text/plain`
    PlainText,
    /// Any other MIME type. Extracted as plain text.
    Other(String),
}

impl FileType {
    /// Resolve a file type from a MIME type string.
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Self::Pdf,
            "text/plain" => Self::PlainText,
            other => Self::Other(other.to_string()),
        }
    }

    /// Resolve a file type from a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::PlainText,
            "md" | "markdown" => Self::Other("text/markdown".to_string()),
            _ => Self::Other("application/octet-stream".to_string()),
        }
    }

    /// Resolve a file type from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_else(|| Self::Other("application/octet-stream".to_string()))
    }

    /// The MIME type string for this file type.
    pub fn mime(&self) -> &str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
            Self::Other(mime) => mime,
        }
    }
}

impl From<String> for FileType {
    fn from(value: String) -> Self {
        Self::from_mime(&value)
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.mime().to_string()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An uploaded file before text extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Original file name.
    pub file_name: String,
    /// Declared file type, used to pick an extractor.
    pub file_type: FileType,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Create a source document from raw bytes.
    pub fn new(file_name: impl Into<String>, file_type: FileType, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), file_type, bytes }
    }
}

/// Extracted document text awaiting chunking.
///
/// Exists only for the duration of one ingestion call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Caller-supplied identifier, copied onto every chunk when present.
    pub id: Option<String>,
    /// Original file name.
    pub source_file: String,
    /// File type the text was extracted from.
    pub file_type: Option<FileType>,
    /// Extracted text.
    pub text: String,
    /// Caller-supplied metadata copied onto every chunk.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a document from already-extracted text.
    pub fn new(source_file: impl Into<String>, file_type: FileType, text: impl Into<String>) -> Self {
        Self {
            id: None,
            source_file: source_file.into(),
            file_type: Some(file_type),
            text: text.into(),
            extra: HashMap::new(),
        }
    }

    /// Attach a caller-supplied identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach caller-supplied metadata.
    ///
    /// Keys listed in [`ChunkMetadata::RESERVED_KEYS`] are dropped.
    pub fn with_extra(mut self, mut extra: HashMap<String, serde_json::Value>) -> Self {
        ChunkMetadata::strip_reserved(&mut extra);
        self.extra = extra;
        self
    }
}

/// A contiguous window of a document's text.
///
/// `start_offset` and the window size are measured in characters, not
/// bytes or model tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The window text, untrimmed.
    pub text: String,
    /// Character offset of the window in the source text.
    pub start_offset: usize,
    /// 0-based position among sibling chunks.
    pub chunk_index: usize,
    /// Number of sibling chunks.
    pub total_chunks: usize,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Provenance stored alongside every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The chunk text.
    pub text: String,
    /// Original file name.
    pub source_file: String,
    /// 0-based position among sibling chunks.
    pub chunk_index: usize,
    /// Number of sibling chunks.
    pub total_chunks: usize,
    /// When the chunk was prepared for storage.
    pub upload_timestamp: DateTime<Utc>,
    /// File type of the source document.
    pub file_type: FileType,
    /// Caller-supplied identifier of the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Caller-supplied metadata.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ChunkMetadata {
    /// Payload keys owned by the pipeline. Caller metadata never overrides them.
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        "text",
        "source_file",
        "chunk_index",
        "total_chunks",
        "upload_timestamp",
        "file_type",
        "document_id",
    ];

    /// Whether `key` names a pipeline-owned payload field.
    pub fn is_reserved(key: &str) -> bool {
        Self::RESERVED_KEYS.contains(&key)
    }

    /// Remove pipeline-owned keys from caller metadata.
    pub fn strip_reserved(extra: &mut HashMap<String, serde_json::Value>) {
        extra.retain(|key, _| !Self::is_reserved(key));
    }
}

/// A vector and its metadata waiting to be written to an index.
///
/// The index assigns the record identifier on upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Metadata stored as the record payload.
    pub metadata: ChunkMetadata,
}

/// A stored chunk: identifier, embedding and metadata. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Identifier assigned by the index.
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Metadata stored as the record payload.
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk paired with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Identifier of the stored record.
    pub id: String,
    /// Cosine similarity (higher is more similar).
    pub score: f32,
    /// 0-based rank within the result list.
    pub rank: usize,
    /// Stored metadata, including the chunk text.
    pub metadata: ChunkMetadata,
}

impl Hit {
    /// The chunk text.
    pub fn text(&self) -> &str {
        &self.metadata.text
    }
}
