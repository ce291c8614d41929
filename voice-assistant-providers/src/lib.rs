//! Chat-completion provider integration for voice-assistant
//!
//! This crate provides the provider abstraction, an OpenAI-compatible client
//! and the AI gateway indirection placed in front of it.

pub mod base;
pub mod gateway;
pub mod openai;

pub use base::{
    LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, ToolCallRequest,
};
pub use gateway::AiGateway;
pub use openai::OpenAIClient;

use voice_assistant_core::config::Config;

/// Build the chat client described by the provider and gateway sections
pub fn build_provider(config: &Config) -> OpenAIClient {
    let gateway = AiGateway::from_config(&config.gateway);

    let api_key = Some(config.provider.api_key.clone()).filter(|key| !key.trim().is_empty());
    let provider_base = config
        .provider
        .api_base
        .clone()
        .filter(|base| !base.trim().is_empty());
    let api_base = gateway
        .as_ref()
        .map(|gw| gw.base_url())
        .or(provider_base);

    let mut extra_headers = config.provider.extra_headers.clone().unwrap_or_default();
    if let Some(gw) = &gateway {
        extra_headers.extend(gw.headers());
    }

    OpenAIClient::new(
        api_key,
        api_base,
        config.agent.model.clone(),
        Some(extra_headers).filter(|headers| !headers.is_empty()),
    )
}
