//! SQLite database management with migrations
//!
//! Holds index metadata, per-file ingestion records and index entries

use super::IndexError;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection handle
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub fn new(db_path: &Path) -> Result<Self, IndexError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::Io {
                source: e,
                context: format!("Failed to create index directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        // single writer, a couple of readers at most
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| IndexError::Pool(format!("Failed to create connection pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| IndexError::Pool(format!("Failed to get connection: {}", e)))?;

            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                ",
            )?;
        }

        let db = Self { pool };
        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<DbConn, IndexError> {
        self.pool
            .get()
            .map_err(|e| IndexError::Pool(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<(), IndexError> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying index migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }
}

/// Database migrations (each string is one migration)
pub(crate) const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Key/value metadata: collection, embedding model, dimension, last update
    CREATE TABLE index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- One row per ingested transcript file
    CREATE TABLE documents (
        source_filename TEXT PRIMARY KEY,
        content_hash TEXT NOT NULL,
        company TEXT NOT NULL,
        chunk_count INTEGER NOT NULL,
        ingested_at TEXT NOT NULL
    );

    -- Index entries; seq gives the stable insertion order used for tie-breaks
    CREATE TABLE entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        chunk_id TEXT NOT NULL UNIQUE,
        document_id TEXT NOT NULL,
        source_filename TEXT NOT NULL,
        company TEXT NOT NULL,
        quarter TEXT,
        year INTEGER,
        chunk_index INTEGER NOT NULL,
        start_offset INTEGER NOT NULL,
        end_offset INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX idx_entries_source ON entries(source_filename);
    CREATE INDEX idx_entries_company ON entries(company COLLATE NOCASE);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("index.sqlite");

        let _db = Database::new(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations_run_once() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("index.sqlite");

        drop(Database::new(&db_path).unwrap());
        let db = Database::new(&db_path).unwrap();

        let conn = db.get_conn().unwrap();
        let (version, rows): (i32, i32) = conn
            .query_row(
                "SELECT MAX(version), COUNT(*) FROM _migrations",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();

        assert_eq!(version, MIGRATIONS.len() as i32);
        assert_eq!(rows, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_schema_exists() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("index.sqlite")).unwrap();
        let conn = db.get_conn().unwrap();

        for table in ["index_meta", "documents", "entries"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
