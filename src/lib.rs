//! Callsight - question answering over earnings call transcripts
//!
//! Loads transcript files, splits them into overlapping chunks, embeds them
//! through an external embedding service and keeps them in a local vector
//! index. Questions are answered by a chat-completion service from the most
//! similar excerpts.

pub mod answer;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod retrieval;
pub mod session;
pub mod storage;

pub use error::{CallsightError, Result};
