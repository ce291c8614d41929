use std::sync::Arc;
use tokio::sync::oneshot;
use voice_assistant_agent::AgentResult;
use voice_assistant_core::session::SessionStatus;

use crate::actor::AgentNamespace;

#[derive(Clone)]
pub struct AppState {
    pub namespace: Arc<AgentNamespace>,
    /// The single session every request is routed to
    pub agent_id: String,
}

impl AppState {
    pub fn new(namespace: Arc<AgentNamespace>, agent_id: impl Into<String>) -> Self {
        Self {
            namespace,
            agent_id: agent_id.into(),
        }
    }
}

/// Messages processed by a session actor, one at a time
pub enum AgentCommand {
    Conversation {
        text: String,
        reply: oneshot::Sender<AgentResult<String>>,
    },
    Status(oneshot::Sender<SessionStatus>),
}
