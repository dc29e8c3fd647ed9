//! Storage layer for Callsight
//!
//! A single on-disk vector index: chunk text, source metadata and embeddings
//! in SQLite, searched exactly by cosine similarity.

pub mod database;
mod index;

pub use database::Database;
pub use index::{cosine_similarity, IndexStore, INDEX_FILE_NAME};

use crate::chunking::Chunk;
use crate::loader::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index not initialized at {path} (run `callsight ingest` first)")]
    NotInitialized { path: PathBuf },

    #[error("Index is empty (run `callsight ingest` first)")]
    Empty,

    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index was built with '{expected}', got '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("Index holds collection '{expected}', not '{actual}'")]
    CollectionMismatch { expected: String, actual: String },

    #[error("Index corrupted: {0}")]
    Corrupted(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// Source metadata stored alongside each chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub document_id: String,
    pub source_filename: String,
    pub company: String,
    pub quarter: Option<String>,
    pub year: Option<u16>,
    pub chunk_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl EntryMetadata {
    /// "Company Q3 2024", omitting unknown parts
    pub fn label(&self) -> String {
        let mut parts = vec![self.company.clone()];
        if let Some(quarter) = &self.quarter {
            parts.push(quarter.clone());
        }
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        parts.join(" ")
    }
}

/// The unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn from_chunk(document: &Document, chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            metadata: EntryMetadata {
                document_id: document.id.clone(),
                source_filename: document.source_filename.clone(),
                company: document.company.clone(),
                quarter: document.quarter.clone(),
                year: document.year,
                chunk_index: chunk.index,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
            },
            embedding,
        }
    }
}

/// An entry with its similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    /// Cosine similarity in [-1, 1], higher is more similar
    pub score: f32,
}

/// Query hits ordered by non-increasing score
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub hits: Vec<ScoredEntry>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredEntry> {
        self.hits.iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a ScoredEntry;
    type IntoIter = std::slice::Iter<'a, ScoredEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Outcome of writing entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    /// Entries whose chunk id was already stored
    pub skipped: usize,
}

/// Ingestion record for one transcript file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source_filename: String,
    pub content_hash: String,
    pub company: String,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn for_document(document: &Document, chunk_count: usize) -> Self {
        Self {
            source_filename: document.source_filename.clone(),
            content_hash: document.content_hash.clone(),
            company: document.company.clone(),
            chunk_count,
            ingested_at: Utc::now(),
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub collection: String,
    pub total_chunks: usize,
    pub total_files: usize,
    pub companies: usize,
    pub embedding_model: Option<String>,
    pub dimension: Option<usize>,
    pub last_update: Option<String>,
}
