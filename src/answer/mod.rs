//! Answer generation from retrieved transcript excerpts
//!
//! Builds a grounded prompt from the retrieval result and passes it to the
//! chat service. The reply is returned exactly as received.

use crate::llm::{ChatMessage, ChatProvider, GenerationError};
use crate::session::Turn;
use crate::storage::QueryResult;
use std::fmt::Write;

const SYSTEM_PROMPT: &str = "You are a helpful financial analyst assistant who provides clear, \
concise insights from earnings calls. Focus on what matters to investors: numbers, growth rates, \
and forward guidance.";

const INSTRUCTIONS: &str = "\
You are a financial analyst assistant helping investors understand earnings calls.

Answer the user's question using ONLY the earnings call transcript excerpts below. \
If the excerpts do not contain the answer, say so instead of guessing.

IMPORTANT INSTRUCTIONS:
- Focus on specific numbers, percentages, and financial metrics
- Mention growth rates and comparisons to previous periods
- Highlight what executives emphasized as most important
- Keep the answer concise and focused on what matters to investors
- If asked about revenue or highlights, prioritize: actual numbers, year-over-year growth, margins, and guidance
- Use natural conversational tone, not bullet points unless specifically asked";

/// Text placed in the context section when retrieval found nothing
pub const NO_CONTEXT: &str = "No relevant transcript excerpts were found.";

/// Grounded question answering over retrieved chunks
pub struct Answerer<'a> {
    chat: &'a dyn ChatProvider,
}

impl<'a> Answerer<'a> {
    pub fn new(chat: &'a dyn ChatProvider) -> Self {
        Self { chat }
    }

    /// Answer a single question from the retrieved context
    pub fn answer(&self, query: &str, result: &QueryResult) -> Result<String, GenerationError> {
        self.answer_with_history(query, result, &[])
    }

    /// Answer with earlier turns of the conversation included in the prompt
    pub fn answer_with_history(
        &self,
        query: &str,
        result: &QueryResult,
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        let messages = build_messages(query, result, history);

        tracing::debug!(
            "Generating answer with {} context chunks via {}",
            result.len(),
            self.chat.model_name()
        );

        self.chat.complete(&messages)
    }
}

/// System and user messages for one question
///
/// Context chunks appear in the order of `result`, which is highest
/// similarity first.
pub fn build_messages(query: &str, result: &QueryResult, history: &[Turn]) -> Vec<ChatMessage> {
    let mut prompt = String::with_capacity(
        INSTRUCTIONS.len() + result.iter().map(|h| h.entry.text.len() + 96).sum::<usize>(),
    );

    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nContext from earnings calls:\n");

    if result.is_empty() {
        prompt.push_str(NO_CONTEXT);
        prompt.push('\n');
    }

    for (i, hit) in result.iter().enumerate() {
        let meta = &hit.entry.metadata;
        // writing to a String cannot fail
        let _ = writeln!(
            prompt,
            "\n[Source {} | {} | {}, chunk {} | similarity {:.3}]\n{}",
            i + 1,
            meta.label(),
            meta.source_filename,
            meta.chunk_index,
            hit.score,
            hit.entry.text
        );
    }

    if !history.is_empty() {
        prompt.push_str("\nPrevious conversation:\n");
        for turn in history {
            let _ = writeln!(prompt, "Q: {}\nA: {}", turn.question, turn.answer);
        }
    }

    let _ = write!(prompt, "\nQuestion: {}\n\nAnswer:", query);

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::storage::{EntryMetadata, IndexEntry, ScoredEntry};
    use std::cell::RefCell;

    struct CapturingChat {
        reply: String,
        seen: RefCell<Vec<ChatMessage>>,
    }

    impl ChatProvider for CapturingChat {
        fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
            *self.seen.borrow_mut() = messages.to_vec();
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "capture"
        }
    }

    fn hit(text: &str, chunk_index: usize, score: f32) -> ScoredEntry {
        ScoredEntry {
            entry: IndexEntry {
                chunk_id: format!("id-{}", chunk_index),
                text: text.to_string(),
                metadata: EntryMetadata {
                    document_id: "doc".to_string(),
                    source_filename: "Nvidia_Q4_2024_1.txt".to_string(),
                    company: "Nvidia".to_string(),
                    quarter: Some("Q4".to_string()),
                    year: Some(2024),
                    chunk_index,
                    start_offset: 0,
                    end_offset: text.len(),
                },
                embedding: Vec::new(),
            },
            score,
        }
    }

    #[test]
    fn test_prompt_keeps_similarity_order() {
        let result = QueryResult {
            hits: vec![
                hit("Data center revenue hit a record.", 4, 0.91),
                hit("Gaming grew 15% year over year.", 1, 0.83),
                hit("Gross margin was 76%.", 7, 0.72),
            ],
        };
        let messages = build_messages("How did the quarter go?", &result, &[]);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let prompt = &messages[1].content;

        let first = prompt.find("Data center revenue").unwrap();
        let second = prompt.find("Gaming grew").unwrap();
        let third = prompt.find("Gross margin").unwrap();
        assert!(first < second && second < third);

        assert!(prompt.contains("[Source 1 | Nvidia Q4 2024 | Nvidia_Q4_2024_1.txt, chunk 4 | similarity 0.910]"));
        assert!(prompt.contains("[Source 3 | Nvidia Q4 2024 | Nvidia_Q4_2024_1.txt, chunk 7 | similarity 0.720]"));
        assert!(prompt.contains("ONLY"));
        assert!(prompt.ends_with("Question: How did the quarter go?\n\nAnswer:"));
        assert!(!prompt.contains(NO_CONTEXT));
    }

    #[test]
    fn test_empty_result_still_calls_service() {
        let chat = CapturingChat {
            reply: "I could not find that in the transcripts.".to_string(),
            seen: RefCell::new(Vec::new()),
        };
        let answer = Answerer::new(&chat)
            .answer("What was revenue?", &QueryResult::default())
            .unwrap();

        assert_eq!(answer, "I could not find that in the transcripts.");
        let seen = chat.seen.borrow();
        assert!(seen[1].content.contains(NO_CONTEXT));
    }

    #[test]
    fn test_history_included() {
        let history = vec![Turn {
            question: "What was revenue?".to_string(),
            answer: "$22.1 billion.".to_string(),
            asked_at: chrono::Utc::now(),
        }];
        let result = QueryResult {
            hits: vec![hit("Revenue was $22.1 billion.", 0, 0.9)],
        };
        let messages = build_messages("And margins?", &result, &history);
        let prompt = &messages[1].content;

        assert!(prompt.contains("Previous conversation:\nQ: What was revenue?\nA: $22.1 billion."));
        assert!(prompt.find("Previous conversation").unwrap() < prompt.find("Question: And margins?").unwrap());
    }

    #[test]
    fn test_reply_returned_verbatim() {
        let chat = CapturingChat {
            reply: "  Revenue rose.\n\n".to_string(),
            seen: RefCell::new(Vec::new()),
        };
        let result = QueryResult {
            hits: vec![hit("Revenue rose.", 0, 0.5)],
        };
        let answer = Answerer::new(&chat).answer("Revenue?", &result).unwrap();
        assert_eq!(answer, "  Revenue rose.\n\n");
    }
}
