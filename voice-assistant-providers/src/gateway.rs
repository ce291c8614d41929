//! AI gateway indirection in front of the chat-completion provider

use std::collections::HashMap;
use voice_assistant_core::config::AiGatewayConfig;

const HOSTED_GATEWAY_BASE: &str = "https://gateway.ai.cloudflare.com/v1";
const GATEWAY_AUTH_HEADER: &str = "cf-aig-authorization";

/// Resolved gateway endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiGateway {
    base_url: String,
    token: Option<String>,
}

impl AiGateway {
    /// Resolve the gateway from configuration
    ///
    /// Returns `None` when neither an explicit url nor an account id with a
    /// gateway name is set, in which case requests go straight to the provider.
    pub fn from_config(config: &AiGatewayConfig) -> Option<Self> {
        let token = Some(config.token.trim().to_string()).filter(|t| !t.is_empty());

        let url = config.url.trim();
        if !url.is_empty() {
            return Some(Self {
                base_url: url.trim_end_matches('/').to_string(),
                token,
            });
        }

        let account_id = config.account_id.trim();
        let name = config.name.trim();
        if account_id.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            base_url: format!(
                "{}/{}/{}/{}",
                HOSTED_GATEWAY_BASE,
                account_id,
                name,
                config.provider.trim()
            ),
            token,
        })
    }

    /// API base requests are sent to
    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Headers authenticating against the gateway itself
    pub fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(token) = &self.token {
            headers.insert(GATEWAY_AUTH_HEADER.to_string(), format!("Bearer {}", token));
        }
        headers
    }
}
