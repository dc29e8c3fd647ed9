//! Semantic retrieval over the transcript index
//!
//! Embeds the question with the same provider used at ingestion time and asks
//! the index for the most similar chunks.

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::storage::{IndexStore, QueryResult};
use serde::{Deserialize, Serialize};

/// Default number of chunks returned per question
pub const DEFAULT_LIMIT: usize = 5;

/// Search query with optional filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text
    pub text: String,

    /// Maximum number of results
    pub limit: usize,

    /// Restrict results to one company (case-insensitive)
    pub company: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            company: None,
        }
    }

    pub fn with_company(mut self, company: Option<String>) -> Self {
        self.company = company.filter(|c| !c.trim().is_empty());
        self
    }
}

/// Question-to-chunks retriever
pub struct Retriever<'a> {
    embedder: &'a dyn EmbeddingProvider,
    store: &'a IndexStore,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn EmbeddingProvider, store: &'a IndexStore) -> Self {
        Self { embedder, store }
    }

    /// Top `query.limit` chunks by cosine similarity, highest first
    ///
    /// Embedding and index errors are returned unchanged.
    pub fn retrieve(&self, query: &SearchQuery) -> Result<QueryResult> {
        self.store.check_model(self.embedder.model_name())?;

        let vector = self.embedder.embed(&query.text)?;
        let result = self
            .store
            .query_filtered(&vector, query.limit, query.company.as_deref())?;

        tracing::debug!(
            "Retrieved {} chunks for query ({} requested{})",
            result.len(),
            query.limit,
            query
                .company
                .as_deref()
                .map(|c| format!(", company {}", c))
                .unwrap_or_default()
        );

        Ok(result)
    }
}
