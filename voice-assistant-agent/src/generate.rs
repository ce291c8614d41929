//! Text generation with bounded tool resolution

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voice_assistant_core::config::AgentConfig;
use voice_assistant_core::session::ChatMessage;
use voice_assistant_core::utils::preview;
use voice_assistant_providers::{LLMProvider, Message, ProviderResult};
use voice_assistant_tools::ToolRegistry;

/// Produces the assistant reply for a transcript
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply, letting the model call `tools` for at most `max_steps` model calls
    ///
    /// Returns `None` when the model produced no text.
    async fn generate(
        &self,
        transcript: &[ChatMessage],
        tools: &ToolRegistry,
        max_steps: usize,
    ) -> ProviderResult<Option<String>>;
}

/// Generator backed by a chat-completion provider
pub struct ChatGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: i32,
    temperature: f64,
}

impl ChatGenerator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.get_default_model());
        Self {
            provider,
            model,
            max_tokens: i32::try_from(max_tokens).unwrap_or(i32::MAX),
            temperature: f64::from(temperature),
        }
    }

    /// Build from the agent section of the configuration
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &AgentConfig) -> Self {
        Self::new(
            provider,
            Some(config.model.clone()),
            config.max_tokens,
            config.temperature,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(
        &self,
        transcript: &[ChatMessage],
        tools: &ToolRegistry,
        max_steps: usize,
    ) -> ProviderResult<Option<String>> {
        let mut messages: Vec<Message> = transcript
            .iter()
            .map(|m| Message {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                name: None,
                tool_call_id: None,
                tool_calls: None,
            })
            .collect();

        let tool_defs = tools.get_definitions();
        let tool_defs = if tool_defs.is_empty() {
            None
        } else {
            Some(tool_defs)
        };

        for step in 1..=max_steps {
            debug!("Generation step {}/{}", step, max_steps);

            let response = self
                .provider
                .chat(
                    messages.clone(),
                    tool_defs.clone(),
                    Some(self.model.clone()),
                    self.max_tokens,
                    self.temperature,
                )
                .await?;

            if !response.has_tool_calls() {
                return Ok(response.content.filter(|c| !c.is_empty()));
            }

            if step == max_steps {
                warn!(
                    "Step budget of {} exhausted with {} pending tool calls",
                    max_steps,
                    response.tool_calls.len()
                );
                return Ok(response.content.filter(|c| !c.is_empty()));
            }

            info!("Model requested {} tool calls", response.tool_calls.len());
            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let args = tool_call.arguments_value();
                info!(
                    "Tool call: {}({})",
                    tool_call.name,
                    preview(&args.to_string(), 200)
                );
                let result = tools.execute(&tool_call.name, args).await;
                debug!("Tool {} returned: {}", tool_call.name, preview(&result, 200));
                messages.push(Message::tool(result, tool_call.id.clone()));
            }
        }

        Ok(None)
    }
}
