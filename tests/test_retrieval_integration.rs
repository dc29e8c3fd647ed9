//! Integration tests for retrieval and answering over an ingested index

mod common;

use callsight::answer::{Answerer, NO_CONTEXT};
use callsight::chunking::Chunker;
use callsight::error::CallsightError;
use callsight::pipeline::Ingestor;
use callsight::retrieval::{Retriever, SearchQuery};
use callsight::storage::{IndexError, IndexStore};
use common::{transcript_text, write_transcript, LetterEmbedder, RecordingChat};
use tempfile::TempDir;

/// Index with three companies, several chunks each
fn ingested_store(temp: &TempDir) -> IndexStore {
    let dir = temp.path().join("transcripts");
    write_transcript(&dir, "Apple_Q3_2024_01.txt", &transcript_text("Apple", 2400));
    write_transcript(&dir, "Microsoft_Q2_2024_01.txt", &transcript_text("Microsoft", 2400));
    write_transcript(&dir, "Zoom_Q4_2023_01.txt", &transcript_text("Zoom", 1500));

    let store = IndexStore::open(&temp.path().join("index"), "earnings_transcripts").unwrap();
    let embedder = LetterEmbedder::new();
    Ingestor::new(&embedder, &store, Chunker::default())
        .ingest_directory(&dir)
        .unwrap();
    store
}

#[test]
fn test_k4_returns_at_most_four_in_descending_order() {
    let temp = TempDir::new().unwrap();
    let store = ingested_store(&temp);
    let embedder = LetterEmbedder::new();

    let result = Retriever::new(&embedder, &store)
        .retrieve(&SearchQuery::new("What did Microsoft say about guidance?", 4))
        .unwrap();

    assert!(result.len() <= 4);
    assert_eq!(result.len(), 4);
    for pair in result.hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_k_larger_than_index_returns_everything() {
    let temp = TempDir::new().unwrap();
    let store = ingested_store(&temp);
    let embedder = LetterEmbedder::new();

    let total = store.len().unwrap();
    let result = Retriever::new(&embedder, &store)
        .retrieve(&SearchQuery::new("results", total + 10))
        .unwrap();
    assert_eq!(result.len(), total);
}

#[test]
fn test_repeated_queries_are_identical() {
    let temp = TempDir::new().unwrap();
    let store = ingested_store(&temp);
    let embedder = LetterEmbedder::new();
    let retriever = Retriever::new(&embedder, &store);
    let query = SearchQuery::new("quarterly results", 5);

    let ids = |r: &callsight::storage::QueryResult| -> Vec<String> {
        r.iter().map(|h| h.entry.chunk_id.clone()).collect()
    };
    let first = retriever.retrieve(&query).unwrap();
    let second = retriever.retrieve(&query).unwrap();
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn test_company_filter() {
    let temp = TempDir::new().unwrap();
    let store = ingested_store(&temp);
    let embedder = LetterEmbedder::new();
    let retriever = Retriever::new(&embedder, &store);

    let query = SearchQuery::new("guidance", 10).with_company(Some("zoom".to_string()));
    let result = retriever.retrieve(&query).unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|h| h.entry.metadata.company == "Zoom"));

    let query = SearchQuery::new("guidance", 10).with_company(Some("Netflix".to_string()));
    assert!(retriever.retrieve(&query).unwrap().is_empty());
}

#[test]
fn test_empty_index_is_index_error() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::open(temp.path(), "earnings_transcripts").unwrap();
    let embedder = LetterEmbedder::new();

    let err = Retriever::new(&embedder, &store)
        .retrieve(&SearchQuery::new("revenue", 4))
        .unwrap_err();
    assert!(matches!(err, CallsightError::Index(IndexError::Empty)));
    assert_eq!(err.kind(), "IndexError");
}

#[test]
fn test_answer_prompt_contains_retrieved_chunks_in_order() {
    let temp = TempDir::new().unwrap();
    let store = ingested_store(&temp);
    let embedder = LetterEmbedder::new();
    let chat = RecordingChat::new("Apple raised guidance.");

    let question = "What did Apple guide for next quarter?";
    let result = Retriever::new(&embedder, &store)
        .retrieve(&SearchQuery::new(question, 3))
        .unwrap();
    let answer = Answerer::new(&chat).answer(question, &result).unwrap();

    assert_eq!(answer, "Apple raised guidance.");
    let prompt = chat.last_prompt();
    assert!(!prompt.contains(NO_CONTEXT));

    let mut last_position = 0;
    for (i, hit) in result.iter().enumerate() {
        let tag = format!(
            "[Source {} | {} | {}, chunk {} | similarity {:.3}]\n{}",
            i + 1,
            hit.entry.metadata.label(),
            hit.entry.metadata.source_filename,
            hit.entry.metadata.chunk_index,
            hit.score,
            hit.entry.text
        );
        let position = prompt.find(&tag).unwrap();
        assert!(position >= last_position);
        last_position = position;
    }
    assert!(prompt.contains(question));
}
