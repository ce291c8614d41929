//! Conversation state data structures

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Role of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A transcript message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Persisted state of one conversation session
///
/// `messages[0]` is always the system instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub session_active: bool,
    /// Epoch milliseconds
    pub start_time: i64,
}

impl ConversationState {
    /// Fresh state holding only the system instruction, started now
    pub fn initial(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            session_active: true,
            start_time: now_millis(),
        }
    }

    /// Append a message to the transcript
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Make `messages[0]` the given system instruction
    ///
    /// Replaces an existing leading system message, otherwise inserts one.
    pub fn set_system_prompt(&mut self, system_prompt: &str) {
        let instruction = ChatMessage::system(system_prompt);
        match self.messages.first_mut() {
            Some(head) if head.role == Role::System => *head = instruction,
            _ => self.messages.insert(0, instruction),
        }
    }

    /// Number of non-system messages
    pub fn message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .count()
    }

    /// Milliseconds elapsed between `start_time` and `now`
    pub fn session_duration_ms(&self, now: i64) -> i64 {
        now - self.start_time
    }

    /// Snapshot reported by the status endpoint
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_active: self.session_active,
            session_duration: self.session_duration_ms(now_millis()),
            message_count: self.message_count(),
            start_time: self.start_time,
        }
    }
}

/// Session status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_active: bool,
    /// Milliseconds since `start_time`
    pub session_duration: i64,
    pub message_count: usize,
    pub start_time: i64,
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
