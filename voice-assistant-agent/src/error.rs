//! Error types for the conversation agent

use thiserror::Error;
use voice_assistant_providers::ProviderError;

/// Failure of a conversation turn or session start
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model invocation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("State store failed: {0}")]
    Store(#[from] voice_assistant_core::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
