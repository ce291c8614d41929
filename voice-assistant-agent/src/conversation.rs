//! Session state manager: one persisted transcript per agent id

use std::sync::Arc;
use tracing::{debug, info, warn};
use voice_assistant_core::config::Config;
use voice_assistant_core::session::{
    ChatMessage, ConversationState, SessionStatus, StateStore,
};
use voice_assistant_core::utils::preview;
use voice_assistant_tools::ToolSource;

use crate::error::AgentResult;
use crate::generate::TextGenerator;

/// Reply stored when the model produced no text
pub const NO_RESPONSE_FALLBACK: &str = "No response generated";

/// Per-session behaviour derived from configuration
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub system_prompt: String,
    pub max_steps: usize,
    /// Enabled tool servers as `(name, url)` pairs
    pub tool_servers: Vec<(String, String)>,
    pub close_tools_after_turn: bool,
    pub resume_persisted: bool,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: config.agent.system_prompt.clone(),
            max_steps: config.agent.max_steps as usize,
            tool_servers: config.tools.enabled_servers(),
            close_tools_after_turn: config.tools.close_after_turn,
            resume_persisted: config.session.resume_persisted,
        }
    }
}

/// The conversation agent behind one session id
pub struct ConversationAgent {
    id: String,
    settings: AgentSettings,
    state: ConversationState,
    generator: Arc<dyn TextGenerator>,
    tools: Arc<dyn ToolSource>,
    store: Arc<dyn StateStore>,
}

impl ConversationAgent {
    pub fn new(
        id: impl Into<String>,
        settings: AgentSettings,
        generator: Arc<dyn TextGenerator>,
        tools: Arc<dyn ToolSource>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let state = ConversationState::initial(&settings.system_prompt);
        Self {
            id: id.into(),
            settings,
            state,
            generator,
            tools,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current conversation state
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Initialize the session and register the configured tool servers
    ///
    /// The transcript is reset to the system instruction unless resuming a
    /// persisted one is enabled. Tool servers that fail to register are
    /// logged and skipped.
    pub async fn on_start(&mut self) -> AgentResult<()> {
        let persisted = if self.settings.resume_persisted {
            self.store.load(&self.id)?
        } else {
            None
        };

        self.state = match persisted {
            Some(mut state) => {
                state.set_system_prompt(&self.settings.system_prompt);
                info!(
                    "Session {} resumed with {} messages",
                    self.id,
                    state.message_count()
                );
                state
            }
            None => ConversationState::initial(&self.settings.system_prompt),
        };
        self.store.save(&self.id, &self.state)?;

        for (name, url) in &self.settings.tool_servers {
            match self.tools.add_server(name, url).await {
                Ok(count) => info!("Tool server '{}' provides {} tools", name, count),
                Err(e) => warn!("Tool server '{}' unavailable: {}", name, e),
            }
        }

        info!("Session {} started", self.id);
        Ok(())
    }

    /// Run one conversation turn and return the assistant reply
    ///
    /// The transcript only changes when the whole turn succeeds.
    pub async fn handle_conversation(&mut self, text: &str) -> AgentResult<String> {
        debug!("Session {} received: {}", self.id, preview(text, 80));

        let mut working = if self.state.session_active {
            self.state.clone()
        } else {
            info!("Session {} inactive, starting a new transcript", self.id);
            ConversationState::initial(&self.settings.system_prompt)
        };
        working.push(ChatMessage::user(text));

        let tools = self.tools.tools().await;
        let generated = self
            .generator
            .generate(&working.messages, &tools, self.settings.max_steps)
            .await;

        if self.settings.close_tools_after_turn {
            self.tools.close_all_connections().await;
        }

        let reply = generated?
            .filter(|reply| !reply.is_empty())
            .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string());

        working.push(ChatMessage::assistant(reply.clone()));
        self.store.save(&self.id, &working)?;
        self.state = working;

        info!("Session {} replied: {}", self.id, preview(&reply, 120));
        Ok(reply)
    }

    /// Status snapshot of the session
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }
}
