//! Chat transcript with the health agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Ordered chat history, oldest first, capped at `max_messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTranscript {
    pub messages: Vec<ChatMessage>,
    pub max_messages: usize,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::with_capacity(200)
    }
}

impl ChatTranscript {
    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(1),
        }
    }

    /// Append a message, dropping the oldest ones beyond the cap.
    pub fn push(&mut self, role: ChatRole, text: impl Into<String>, sent_at: DateTime<Utc>) {
        self.messages.push(ChatMessage {
            role,
            text: text.into(),
            sent_at,
        });
        self.trim();
    }

    /// Change the cap, dropping the oldest messages beyond it.
    pub fn set_capacity(&mut self, max_messages: usize) {
        self.max_messages = max_messages.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_capacity_drops_oldest() {
        let mut transcript = ChatTranscript::with_capacity(5);
        for text in ["a", "b", "c", "d"] {
            transcript.push(ChatRole::User, text, Utc::now());
        }

        transcript.set_capacity(2);
        let texts: Vec<&str> = transcript.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "d"]);
        assert_eq!(transcript.max_messages, 2);
    }

    #[test]
    fn test_push_caps_history() {
        let mut transcript = ChatTranscript::with_capacity(2);
        let now = Utc::now();
        transcript.push(ChatRole::User, "hi", now);
        transcript.push(ChatRole::Agent, "hello", now);
        transcript.push(ChatRole::User, "I have a headache", now);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages[0].text, "hello");
        assert_eq!(transcript.last().unwrap().role, ChatRole::User);
    }
}
