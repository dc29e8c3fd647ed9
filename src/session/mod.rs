//! Chat session state
//!
//! Keeps the question/answer history of one interactive chat in memory so
//! follow-up questions can refer back to earlier answers.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question and the answer given to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// An interactive chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: Uuid,

    /// When the conversation was started
    pub started_at: DateTime<Utc>,

    /// Completed turns, oldest first
    pub turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    /// Append a completed turn
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Get conversation duration
    pub fn duration(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_creation() {
        let a = Conversation::new();
        let b = Conversation::new();
        assert!(a.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_recent_returns_last_turns_in_order() {
        let mut conversation = Conversation::new();
        for i in 0..5 {
            conversation.record(format!("q{}", i), format!("a{}", i));
        }

        let recent: Vec<&str> = conversation
            .recent(3)
            .iter()
            .map(|t| t.question.as_str())
            .collect();
        assert_eq!(recent, vec!["q2", "q3", "q4"]);
        assert_eq!(conversation.recent(10).len(), 5);
        assert!(conversation.recent(0).is_empty());
    }
}
