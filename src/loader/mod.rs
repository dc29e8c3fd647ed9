//! Transcript loading
//!
//! Reads `.txt` transcripts from a directory and derives company, quarter and
//! year from the `Company_Quarter_Year_Index` filename convention.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Transcript directory not found: {dir}")]
    DirectoryNotFound { dir: PathBuf },

    #[error("No transcript files (*.txt) found in {dir}")]
    NoTranscripts { dir: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Transcript {path} is not valid UTF-8 text")]
    InvalidEncoding { path: PathBuf },
}

/// A loaded transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Hash over source filename and content hash, unique per file
    pub id: String,
    /// BLAKE3 hash of `raw_text`; unchanged text keeps it across runs
    pub content_hash: String,
    pub source_filename: String,
    pub company: String,
    pub quarter: Option<String>,
    pub year: Option<u16>,
    pub raw_text: String,
}

impl Document {
    /// Build a document from a filename and its text
    pub fn new(source_filename: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let source_filename = source_filename.into();
        let raw_text = raw_text.into();
        let name = TranscriptName::parse(&source_filename);

        let text_hash = content_hash(raw_text.as_bytes());

        Self {
            id: content_hash(format!("{}\u{1f}{}", source_filename, text_hash).as_bytes()),
            content_hash: text_hash,
            source_filename,
            company: name.company,
            quarter: name.quarter,
            year: name.year,
            raw_text,
        }
    }
}

/// Company/quarter/year parsed from a transcript filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptName {
    pub company: String,
    pub quarter: Option<String>,
    pub year: Option<u16>,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<company>.+?)_(?P<quarter>[Qq][1-4])_(?P<year>\d{4})(?:_(?P<index>[^_]+))?$")
            .expect("transcript name pattern is valid")
    })
}

impl TranscriptName {
    /// Parse `Company_Quarter_Year_Index.txt`; falls back to the file stem as company
    pub fn parse(filename: &str) -> Self {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        match name_pattern().captures(stem) {
            Some(caps) => Self {
                company: caps["company"].to_string(),
                quarter: Some(caps["quarter"].to_uppercase()),
                year: caps["year"].parse().ok(),
            },
            None => Self {
                company: stem.to_string(),
                quarter: None,
                year: None,
            },
        }
    }
}

/// BLAKE3 hash truncated to 32 hex characters
pub fn content_hash(data: &[u8]) -> String {
    let hex = blake3::hash(data).to_hex();
    hex[..32].to_string()
}

/// Load every `.txt` transcript in `dir`, sorted by filename
pub fn load_directory(dir: &Path) -> Result<Vec<Document>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::DirectoryNotFound {
            dir: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|e| LoadError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && is_transcript(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(LoadError::NoTranscripts {
            dir: dir.to_path_buf(),
        });
    }

    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_file(&path)?);
    }

    tracing::info!("Loaded {} transcripts from {}", documents.len(), dir.display());
    Ok(documents)
}

fn is_transcript(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

fn load_file(path: &Path) -> Result<Document, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw_text = String::from_utf8(bytes).map_err(|_| LoadError::InvalidEncoding {
        path: path.to_path_buf(),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::debug!("Read {} ({} bytes)", filename, raw_text.len());
    Ok(Document::new(filename, raw_text))
}
