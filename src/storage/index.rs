//! On-disk vector index with exact cosine search

use super::{
    Database, DocumentRecord, EntryMetadata, IndexEntry, IndexError, IndexStats,
    QueryResult, ScoredEntry, UpsertStats,
};
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};

/// File name of the index database inside the index directory
pub const INDEX_FILE_NAME: &str = "index.sqlite";

const META_COLLECTION: &str = "collection";
const META_MODEL: &str = "embedding_model";
const META_DIMENSION: &str = "dimension";
const META_LAST_UPDATE: &str = "last_update";

/// Handle to the single named collection of an on-disk index
///
/// Assumes a single writer; concurrent ingestion processes are unsupported.
pub struct IndexStore {
    database: Database,
    path: PathBuf,
    collection: String,
}

impl IndexStore {
    /// Open the index in `index_dir`, creating it if needed
    pub fn open(index_dir: &Path, collection: &str) -> Result<Self, IndexError> {
        let path = index_dir.join(INDEX_FILE_NAME);
        let database = Database::new(&path)?;
        let store = Self {
            database,
            path,
            collection: collection.to_string(),
        };
        store.bind_collection()?;

        tracing::debug!("Opened index {} ({})", store.path.display(), collection);
        Ok(store)
    }

    /// Open an index that must already exist
    pub fn open_existing(index_dir: &Path, collection: &str) -> Result<Self, IndexError> {
        let path = index_dir.join(INDEX_FILE_NAME);
        if !path.is_file() {
            return Err(IndexError::NotInitialized { path });
        }
        Self::open(index_dir, collection)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn bind_collection(&self) -> Result<(), IndexError> {
        let conn = self.database.get_conn()?;
        match get_meta(&conn, META_COLLECTION)? {
            Some(existing) if existing != self.collection => Err(IndexError::CollectionMismatch {
                expected: existing,
                actual: self.collection.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                set_meta(&conn, META_COLLECTION, &self.collection)?;
                Ok(())
            }
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize, IndexError> {
        let conn = self.database.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Embedding model the index was built with, if any entries were written
    pub fn embedding_model(&self) -> Result<Option<String>, IndexError> {
        let conn = self.database.get_conn()?;
        get_meta(&conn, META_MODEL)
    }

    /// Vector dimension fixed by the first write
    pub fn dimension(&self) -> Result<Option<usize>, IndexError> {
        let conn = self.database.get_conn()?;
        read_dimension(&conn)
    }

    /// Fail if the index was built with a different embedding model
    pub fn check_model(&self, model: &str) -> Result<(), IndexError> {
        match self.embedding_model()? {
            Some(expected) if expected != model => Err(IndexError::ModelMismatch {
                expected,
                actual: model.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Write entries in one transaction; entries whose chunk id exists are skipped
    pub fn upsert(&self, entries: &[IndexEntry], model: &str) -> Result<UpsertStats, IndexError> {
        let mut conn = self.database.get_conn()?;
        let tx = conn.transaction()?;

        let stats = insert_entries(&tx, entries, model)?;
        set_meta(&tx, META_LAST_UPDATE, &Utc::now().to_rfc3339())?;

        tx.commit()?;

        tracing::debug!(
            "Upserted {} entries ({} already present)",
            stats.inserted,
            stats.skipped
        );
        Ok(stats)
    }

    /// Replace everything stored for one file with `entries`, atomically
    pub fn replace_document(
        &self,
        record: &DocumentRecord,
        entries: &[IndexEntry],
        model: &str,
    ) -> Result<UpsertStats, IndexError> {
        let mut conn = self.database.get_conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM entries WHERE source_filename = ?1",
            params![record.source_filename],
        )?;

        let stats = insert_entries(&tx, entries, model)?;

        tx.execute(
            "INSERT OR REPLACE INTO documents
                (source_filename, content_hash, company, chunk_count, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.source_filename,
                record.content_hash,
                record.company,
                record.chunk_count as i64,
                record.ingested_at.to_rfc3339(),
            ],
        )?;
        set_meta(&tx, META_LAST_UPDATE, &Utc::now().to_rfc3339())?;

        tx.commit()?;

        if removed > 0 {
            tracing::debug!(
                "Replaced {} stale entries of {}",
                removed,
                record.source_filename
            );
        }
        Ok(stats)
    }

    /// Stored content hash of a file, if it was ingested before
    pub fn document_hash(&self, source_filename: &str) -> Result<Option<String>, IndexError> {
        let conn = self.database.get_conn()?;
        let hash = conn
            .query_row(
                "SELECT content_hash FROM documents WHERE source_filename = ?1",
                params![source_filename],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// All ingestion records, by filename
    pub fn documents(&self) -> Result<Vec<DocumentRecord>, IndexError> {
        let conn = self.database.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_filename, content_hash, company, chunk_count, ingested_at
             FROM documents ORDER BY source_filename",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (source_filename, content_hash, company, chunk_count, ingested_at) = row?;
            let ingested_at = DateTime::parse_from_rfc3339(&ingested_at)
                .map_err(|e| IndexError::Corrupted(format!("bad ingested_at timestamp: {}", e)))?
                .with_timezone(&Utc);
            records.push(DocumentRecord {
                source_filename,
                content_hash,
                company,
                chunk_count: chunk_count as usize,
                ingested_at,
            });
        }
        Ok(records)
    }

    /// Distinct companies with at least one entry, sorted
    pub fn companies(&self) -> Result<Vec<String>, IndexError> {
        let conn = self.database.get_conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT company FROM entries ORDER BY company")?;
        let companies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companies)
    }

    /// The `k` entries most similar to `vector`
    pub fn query(&self, vector: &[f32], k: usize) -> Result<QueryResult, IndexError> {
        self.query_filtered(vector, k, None)
    }

    /// The `k` most similar entries, optionally restricted to one company
    ///
    /// Equal scores keep insertion order, so repeated queries return the same
    /// sequence.
    pub fn query_filtered(
        &self,
        vector: &[f32],
        k: usize,
        company: Option<&str>,
    ) -> Result<QueryResult, IndexError> {
        let conn = self.database.get_conn()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        if total == 0 {
            return Err(IndexError::Empty);
        }

        let dimension = read_dimension(&conn)?.ok_or_else(|| {
            IndexError::Corrupted("entries present but no dimension recorded".to_string())
        })?;
        if vector.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let mut stmt = conn.prepare(
            "SELECT seq, chunk_id, document_id, source_filename, company, quarter, year,
                    chunk_index, start_offset, end_offset, text, embedding
             FROM entries
             WHERE ?1 IS NULL OR company = ?1 COLLATE NOCASE
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![company], |row| {
            let seq: i64 = row.get(0)?;
            let year: Option<i64> = row.get(6)?;
            let metadata = EntryMetadata {
                document_id: row.get(2)?,
                source_filename: row.get(3)?,
                company: row.get(4)?,
                quarter: row.get(5)?,
                year: year.and_then(|y| u16::try_from(y).ok()),
                chunk_index: row.get::<_, i64>(7)? as usize,
                start_offset: row.get::<_, i64>(8)? as usize,
                end_offset: row.get::<_, i64>(9)? as usize,
            };
            let chunk_id: String = row.get(1)?;
            let text: String = row.get(10)?;
            let blob: Vec<u8> = row.get(11)?;
            Ok((seq, chunk_id, text, metadata, blob))
        })?;

        let mut scored: Vec<(i64, ScoredEntry)> = Vec::new();
        for row in rows {
            let (seq, chunk_id, text, metadata, blob) = row?;
            let embedding = decode_embedding(&blob, dimension)?;
            let score = cosine_similarity(vector, &embedding);
            scored.push((
                seq,
                ScoredEntry {
                    entry: IndexEntry {
                        chunk_id,
                        text,
                        metadata,
                        embedding,
                    },
                    score,
                },
            ));
        }

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            b.score.total_cmp(&a.score).then_with(|| seq_a.cmp(seq_b))
        });
        scored.truncate(k);

        Ok(QueryResult {
            hits: scored.into_iter().map(|(_, hit)| hit).collect(),
        })
    }

    /// Index statistics
    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        let conn = self.database.get_conn()?;

        let total_chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        let total_files: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let companies: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT company) FROM entries",
            [],
            |row| row.get(0),
        )?;

        Ok(IndexStats {
            collection: self.collection.clone(),
            total_chunks: total_chunks as usize,
            total_files: total_files as usize,
            companies: companies as usize,
            embedding_model: get_meta(&conn, META_MODEL)?,
            dimension: read_dimension(&conn)?,
            last_update: get_meta(&conn, META_LAST_UPDATE)?,
        })
    }

    /// Remove all entries, records and model/dimension bindings; keeps the collection name
    pub fn clear(&self) -> Result<(), IndexError> {
        let mut conn = self.database.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM documents", [])?;
        tx.execute(
            "DELETE FROM index_meta WHERE key != ?1",
            params![META_COLLECTION],
        )?;
        tx.commit()?;

        tracing::info!("Cleared index {}", self.path.display());
        Ok(())
    }
}

fn insert_entries(
    tx: &Transaction<'_>,
    entries: &[IndexEntry],
    model: &str,
) -> Result<UpsertStats, IndexError> {
    let mut stats = UpsertStats::default();
    let Some(first) = entries.first() else {
        return Ok(stats);
    };

    match get_meta(tx, META_MODEL)? {
        Some(expected) if expected != model => {
            return Err(IndexError::ModelMismatch {
                expected,
                actual: model.to_string(),
            });
        }
        Some(_) => {}
        None => set_meta(tx, META_MODEL, model)?,
    }

    let dimension = match read_dimension(tx)? {
        Some(dimension) => dimension,
        None => {
            if first.embedding.is_empty() {
                return Err(IndexError::DimensionMismatch {
                    expected: 1,
                    actual: 0,
                });
            }
            set_meta(tx, META_DIMENSION, &first.embedding.len().to_string())?;
            first.embedding.len()
        }
    };

    let mut seen = AHashSet::with_capacity(entries.len());
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO entries
            (chunk_id, document_id, source_filename, company, quarter, year,
             chunk_index, start_offset, end_offset, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    for entry in entries {
        if entry.embedding.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: entry.embedding.len(),
            });
        }
        if !seen.insert(entry.chunk_id.as_str()) {
            stats.skipped += 1;
            continue;
        }

        let meta = &entry.metadata;
        let changed = stmt.execute(params![
            entry.chunk_id,
            meta.document_id,
            meta.source_filename,
            meta.company,
            meta.quarter,
            meta.year.map(i64::from),
            meta.chunk_index as i64,
            meta.start_offset as i64,
            meta.end_offset as i64,
            entry.text,
            encode_embedding(&entry.embedding),
        ])?;

        if changed == 0 {
            stats.skipped += 1;
        } else {
            stats.inserted += 1;
        }
    }

    Ok(stats)
}

fn get_meta(conn: &rusqlite::Connection, key: &str) -> Result<Option<String>, IndexError> {
    let value = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_meta(conn: &rusqlite::Connection, key: &str, value: &str) -> Result<(), IndexError> {
    conn.execute(
        "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn read_dimension(conn: &rusqlite::Connection) -> Result<Option<usize>, IndexError> {
    match get_meta(conn, META_DIMENSION)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| IndexError::Corrupted(format!("bad dimension value '{}'", raw))),
        None => Ok(None),
    }
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(blob: &[u8], dimension: usize) -> Result<Vec<f32>, IndexError> {
    let expected_len = dimension * std::mem::size_of::<f32>();
    if blob.len() != expected_len {
        return Err(IndexError::Corrupted(format!(
            "embedding byte length {} does not match dimension {}",
            blob.len(),
            dimension
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity in [-1, 1]; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}
