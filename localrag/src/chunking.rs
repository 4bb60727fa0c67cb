//! Character-window chunking.
//!
//! Text is split into fixed-size windows measured in characters (Unicode
//! scalar values), each window starting `chunk_size - overlap` characters
//! after the previous one. Windows that are blank after trimming are
//! dropped; kept windows retain their untrimmed text.
//!
//! ```rust,ignore
//! use localrag::FixedSizeChunker;
//!
//! let chunker = FixedSizeChunker::new(500, 50)?;
//! let chunks = chunker.chunk(&text);
//! ```

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// A strategy for splitting document text into chunks.
///
/// Implementations must be deterministic: the output depends only on the
/// input text and the chunker's parameters.
pub trait Chunker: Send + Sync {
    /// Split text into chunks with contiguous `chunk_index` values from 0.
    ///
    /// Returns an empty `Vec` for empty or blank text.
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Splits text into overlapping fixed-size character windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// An overlap of `chunk_size` or more is clamped to `chunk_size - 1` so
    /// the window always advances.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        Ok(Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) })
    }

    /// Maximum window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Effective overlap in characters, after clamping.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance in characters between consecutive window starts.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character, so windows can be cut on char boundaries.
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_count = offsets.len();
        let byte_at = |n: usize| if n >= char_count { text.len() } else { offsets[n] };

        let mut windows = Vec::new();
        let mut start = 0;
        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            let window = &text[byte_at(start)..byte_at(end)];
            if !window.trim().is_empty() {
                windows.push((start, window));
            }
            start += self.step();
        }

        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start_offset, window))| Chunk {
                text: window.to_string(),
                start_offset,
                chunk_index,
                total_chunks,
            })
            .collect()
    }
}

/// Split `text` into overlapping character windows.
///
/// Convenience wrapper around [`FixedSizeChunker`].
///
/// # Errors
///
/// Returns [`RagError::ChunkingError`] if `chunk_size` is zero.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    Ok(FixedSizeChunker::new(chunk_size, chunk_overlap)?.chunk(text))
}
