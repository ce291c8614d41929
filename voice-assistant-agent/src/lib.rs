//! Conversation agent for voice-assistant
//!
//! This crate provides the session state manager and the bounded
//! tool-resolution loop that turns a transcript into a reply.

pub mod conversation;
pub mod error;
pub mod generate;

pub use conversation::{AgentSettings, ConversationAgent, NO_RESPONSE_FALLBACK};
pub use error::{AgentError, AgentResult};
pub use generate::{ChatGenerator, TextGenerator};
