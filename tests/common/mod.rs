//! Shared fixtures for integration tests
#![allow(dead_code)]

use callsight::embedding::{EmbeddingProvider, EmbeddingServiceError};
use callsight::llm::{ChatMessage, ChatProvider, GenerationError};
use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;

/// Deterministic embedder: letter frequencies of the text
pub struct LetterEmbedder {
    pub calls: Cell<usize>,
}

impl LetterEmbedder {
    pub fn new() -> Self {
        Self { calls: Cell::new(0) }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        // keep every vector non-zero
        v.push(1.0);
        v
    }
}

impl EmbeddingProvider for LetterEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "letter-frequency"
    }
}

/// Embedder whose requests fail after `ok_calls` successful ones
pub struct FlakyEmbedder {
    pub ok_calls: usize,
    pub calls: Cell<usize>,
}

impl EmbeddingProvider for FlakyEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call >= self.ok_calls {
            return Err(EmbeddingServiceError::Network(
                "connection refused".to_string(),
            ));
        }
        Ok(texts.iter().map(|t| LetterEmbedder::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "letter-frequency"
    }
}

/// Chat stub that records the messages it was sent
pub struct RecordingChat {
    pub reply: String,
    pub requests: RefCell<Vec<Vec<ChatMessage>>>,
}

impl RecordingChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.requests
            .borrow()
            .last()
            .and_then(|messages| messages.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

impl ChatProvider for RecordingChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        self.requests.borrow_mut().push(messages.to_vec());
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

/// Sentence-based transcript text of exactly `len` ASCII characters
pub fn transcript_text(seed: &str, len: usize) -> String {
    let sentence = format!("{} reported strong quarterly results and raised guidance. ", seed);
    sentence.chars().cycle().take(len).collect()
}

pub fn write_transcript(dir: &Path, name: &str, text: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), text).unwrap();
}

/// Serve a single HTTP response on a local port
///
/// Returns the base URL and a handle yielding the raw request that was received.
pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);

        let mut request = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            request.push_str(&line);
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }

        let mut payload = vec![0u8; content_length];
        reader.read_exact(&mut payload).unwrap();
        request.push_str(&String::from_utf8_lossy(&payload));

        let response = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        request
    });

    (format!("http://{}", addr), handle)
}

/// Accept one connection and never answer it
pub fn serve_silence(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            std::thread::sleep(hold);
            drop(stream);
        }
    });

    format!("http://{}", addr)
}
