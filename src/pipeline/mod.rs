//! Ingestion pipeline: load, chunk, embed and index transcripts
//!
//! Runs sequentially. Each changed file is embedded completely before
//! anything of it is written, and its entries replace the old ones in a
//! single transaction.

use crate::chunking::Chunker;
use crate::embedding::{BatchEmbedder, EmbeddingProvider};
use crate::error::Result;
use crate::loader::{self, Document};
use crate::storage::{DocumentRecord, IndexEntry, IndexStore};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Default number of chunks sent per embedding request
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Files seen for the first time
    pub new: usize,
    /// Files whose content changed since the last run
    pub updated: usize,
    /// Unchanged files, not re-embedded
    pub skipped: usize,
    pub chunks_indexed: usize,
    pub embedding_requests: usize,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn files_processed(&self) -> usize {
        self.new + self.updated
    }
}

/// Loads a transcript directory into the index
pub struct Ingestor<'a> {
    embedder: &'a dyn EmbeddingProvider,
    store: &'a IndexStore,
    chunker: Chunker,
    batch_size: usize,
}

impl<'a> Ingestor<'a> {
    pub fn new(embedder: &'a dyn EmbeddingProvider, store: &'a IndexStore, chunker: Chunker) -> Self {
        Self {
            embedder,
            store,
            chunker,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Index new and changed transcripts in `dir`, skipping unchanged ones
    ///
    /// An embedding failure aborts the run. Files finished before the failure
    /// stay indexed; nothing of the failing file is written.
    pub fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let start = Instant::now();
        let documents = loader::load_directory(dir)?;
        self.store.check_model(self.embedder.model_name())?;

        info!(
            "Ingesting {} transcripts from {} ({} char chunks, {} overlap)",
            documents.len(),
            dir.display(),
            self.chunker.chunk_size(),
            self.chunker.overlap()
        );

        let mut report = IngestReport::default();
        for document in &documents {
            let previous = self.store.document_hash(&document.source_filename)?;
            match previous {
                Some(hash) if hash == document.content_hash => {
                    debug!("Skipping unchanged {}", document.source_filename);
                    report.skipped += 1;
                    continue;
                }
                Some(_) => report.updated += 1,
                None => report.new += 1,
            }

            let (chunks, requests) = self.index_document(document)?;
            report.chunks_indexed += chunks;
            report.embedding_requests += requests;
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Ingestion complete: {} new, {} updated, {} unchanged, {} chunks in {}ms",
            report.new, report.updated, report.skipped, report.chunks_indexed, report.elapsed_ms
        );

        Ok(report)
    }

    /// Clear the index, then ingest everything in `dir`
    pub fn rebuild(&self, dir: &Path) -> Result<IngestReport> {
        // fail on a bad directory before throwing the old index away
        let documents = loader::load_directory(dir)?;
        info!(
            "Rebuilding index {} from {} transcripts",
            self.store.path().display(),
            documents.len()
        );

        self.store.clear()?;
        self.ingest_directory(dir)
    }

    fn index_document(&self, document: &Document) -> Result<(usize, usize)> {
        // blank transcripts are recorded with no entries and never embedded
        let chunks = if document.raw_text.trim().is_empty() {
            Vec::new()
        } else {
            self.chunker.chunk(document)
        };
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let batch = BatchEmbedder::new(self.embedder, self.batch_size).embed_all(&texts)?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(batch.vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(document, chunk, vector))
            .collect();

        let record = DocumentRecord::for_document(document, entries.len());
        let stats = self
            .store
            .replace_document(&record, &entries, self.embedder.model_name())?;

        debug!(
            "Indexed {}: {} chunks ({} duplicates skipped)",
            document.source_filename, stats.inserted, stats.skipped
        );

        Ok((stats.inserted, batch.requests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingServiceError;
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Deterministic embedder that counts requests
    struct CountingEmbedder {
        calls: Cell<usize>,
    }

    impl EmbeddingProvider for CountingEmbedder {
        fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingServiceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_unchanged_files_are_not_reembedded() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("transcripts");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("Apple_Q1_2024_1.txt"), "a".repeat(1800)).unwrap();

        let store = IndexStore::open(&temp.path().join("index"), "test").unwrap();
        let embedder = CountingEmbedder { calls: Cell::new(0) };
        let ingestor = Ingestor::new(&embedder, &store, Chunker::default());

        let first = ingestor.ingest_directory(&dir).unwrap();
        assert_eq!(first.new, 1);
        assert_eq!(first.chunks_indexed, 2);
        assert_eq!(embedder.calls.get(), 1);

        let second = ingestor.ingest_directory(&dir).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.files_processed(), 0);
        assert_eq!(embedder.calls.get(), 1);
    }

    #[test]
    fn test_batch_size_controls_requests() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("transcripts");
        std::fs::create_dir(&dir).unwrap();
        // 4200 chars -> 5 chunks
        std::fs::write(dir.join("Tesla_Q2_2024_1.txt"), "t".repeat(4200)).unwrap();

        let store = IndexStore::open(&temp.path().join("index"), "test").unwrap();
        let embedder = CountingEmbedder { calls: Cell::new(0) };
        let report = Ingestor::new(&embedder, &store, Chunker::default())
            .with_batch_size(2)
            .ingest_directory(&dir)
            .unwrap();

        assert_eq!(report.chunks_indexed, 5);
        assert_eq!(report.embedding_requests, 3);
    }

    #[test]
    fn test_blank_transcript_is_recorded_without_embedding() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("transcripts");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("Blank_Q1_2024_01.txt"), " \n\t\n").unwrap();
        std::fs::write(dir.join("Zoom_Q1_2024_01.txt"), "z".repeat(500)).unwrap();

        let store = IndexStore::open(&temp.path().join("index"), "test").unwrap();
        let embedder = CountingEmbedder { calls: Cell::new(0) };
        let report = Ingestor::new(&embedder, &store, Chunker::default())
            .ingest_directory(&dir)
            .unwrap();

        assert_eq!(report.new, 2);
        assert_eq!(report.chunks_indexed, 1);
        assert_eq!(embedder.calls.get(), 1);
        assert_eq!(
            store.document_hash("Blank_Q1_2024_01.txt").unwrap(),
            Some(crate::loader::content_hash(b" \n\t\n"))
        );
    }
}
