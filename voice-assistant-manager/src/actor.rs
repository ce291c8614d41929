//! Session actors: one mailbox task per agent id

use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info};
use voice_assistant_agent::ConversationAgent;
use voice_assistant_core::session::SessionStatus;

use crate::state::AgentCommand;

const MAILBOX_CAPACITY: usize = 32;

/// Builds the agent for a session id; called once per id
pub type AgentFactory = Arc<dyn Fn(&str) -> anyhow::Result<ConversationAgent> + Send + Sync>;

/// Owns one conversation agent and serializes access to it
pub struct AgentActor {
    agent: ConversationAgent,
    rx: mpsc::Receiver<AgentCommand>,
}

impl AgentActor {
    pub fn new(agent: ConversationAgent, rx: mpsc::Receiver<AgentCommand>) -> Self {
        Self { agent, rx }
    }

    pub async fn run(mut self) {
        info!("Session actor {} started", self.agent.id());

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                AgentCommand::Conversation { text, reply } => {
                    let result = self.agent.handle_conversation(&text).await;
                    if let Err(e) = &result {
                        error!("Session {} conversation failed: {}", self.agent.id(), e);
                    }
                    if reply.send(result).is_err() {
                        debug!("Conversation caller went away before the reply");
                    }
                }
                AgentCommand::Status(reply) => {
                    let _ = reply.send(self.agent.status());
                }
            }
        }

        info!("Session actor {} stopped", self.agent.id());
    }
}

/// Cloneable address of a running session actor
#[derive(Clone)]
pub struct AgentHandle {
    id: String,
    tx: mpsc::Sender<AgentCommand>,
}

impl AgentHandle {
    /// Spawn an actor for an already started agent
    pub fn spawn(agent: ConversationAgent) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let id = agent.id().to_string();
        tokio::spawn(AgentActor::new(agent, rx).run());
        Self { id, tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Run one conversation turn
    pub async fn converse(&self, text: impl Into<String>) -> anyhow::Result<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentCommand::Conversation {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| anyhow!("session actor {} is not running", self.id))?;
        let reply = rx
            .await
            .map_err(|_| anyhow!("session actor {} dropped the request", self.id))??;
        Ok(reply)
    }

    pub async fn status(&self) -> anyhow::Result<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentCommand::Status(reply))
            .await
            .map_err(|_| anyhow!("session actor {} is not running", self.id))?;
        rx.await
            .map_err(|_| anyhow!("session actor {} dropped the request", self.id))
    }
}

/// Registry of live session actors addressed by name
pub struct AgentNamespace {
    factory: AgentFactory,
    agents: Mutex<HashMap<String, AgentHandle>>,
}

impl AgentNamespace {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory,
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// Return the actor for `name`, creating and starting it on first use
    pub async fn get_agent_by_name(&self, name: &str) -> anyhow::Result<AgentHandle> {
        let mut agents = self.agents.lock().await;
        if let Some(handle) = agents.get(name).filter(|h| h.is_alive()) {
            return Ok(handle.clone());
        }

        let mut agent =
            (self.factory)(name).with_context(|| format!("failed to create session {}", name))?;
        agent
            .on_start()
            .await
            .with_context(|| format!("failed to start session {}", name))?;

        let handle = AgentHandle::spawn(agent);
        agents.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Number of live actors
    pub async fn len(&self) -> usize {
        self.agents
            .lock()
            .await
            .values()
            .filter(|h| h.is_alive())
            .count()
    }
}
