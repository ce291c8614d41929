//! Conversation session state
//!
//! A session owns one transcript plus its activity flag and start time. The
//! state is persisted through a [`StateStore`] after every change.

pub mod state;
pub mod store;

pub use state::{ChatMessage, ConversationState, Role, SessionStatus};
pub use store::{FileStateStore, MemoryStateStore, StateStore};
