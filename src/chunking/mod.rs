//! Fixed-size character chunking with overlap

use crate::error::{CallsightError, Result};
use crate::loader::{content_hash, Document};
use serde::{Deserialize, Serialize};

/// Default window size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A window of document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Hash over source filename, offsets and text
    pub id: String,
    pub document_id: String,
    /// Position of the chunk within its document
    pub index: usize,
    pub text: String,
    /// Character offset of the first character (inclusive)
    pub start_offset: usize,
    /// Character offset past the last character (exclusive)
    pub end_offset: usize,
}

impl Chunk {
    /// Number of characters in the chunk
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Sliding-window chunker
///
/// Windows are `chunk_size` characters wide and advance by
/// `chunk_size - overlap`. Boundaries ignore words and sentences.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Fails unless `0 <= overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CallsightError::InvalidConfigValue {
                path: "chunking.chunk_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if overlap >= chunk_size {
            return Err(CallsightError::InvalidConfigValue {
                path: "chunking.overlap".to_string(),
                message: format!("{} must be smaller than chunk_size {}", overlap, chunk_size),
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of chunks produced for a text of `len` characters
    pub fn expected_chunks(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            (len - self.overlap).div_ceil(self.step())
        }
    }

    /// Split a document into ordered, overlapping chunks
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.raw_text.as_str();

        // byte offset of every char start, plus the end of the string
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(self.expected_chunks(total_chars));
        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(total_chars);
            let slice = &text[boundaries[start]..boundaries[end]];

            chunks.push(Chunk {
                id: chunk_id(&document.source_filename, start, end, slice),
                document_id: document.id.clone(),
                index: chunks.len(),
                text: slice.to_string(),
                start_offset: start,
                end_offset: end,
            });

            if end == total_chars {
                break;
            }
            start += self.step();
        }

        tracing::debug!(
            "Chunked {} into {} chunks ({} chars)",
            document.source_filename,
            chunks.len(),
            total_chars
        );
        chunks
    }
}

fn chunk_id(source_filename: &str, start: usize, end: usize, text: &str) -> String {
    let key = format!("{}\u{1f}{}\u{1f}{}\u{1f}{}", source_filename, start, end, text);
    content_hash(key.as_bytes())
}
