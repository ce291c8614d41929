//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default system instruction placed at the head of every transcript
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful voice assistant. Provide concise, conversational responses that are easy to understand when spoken aloud. Keep responses brief but informative.";

/// Root configuration for voice-assistant
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Conversation agent settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Chat-completion provider credentials
    #[serde(default)]
    pub provider: ProviderConfig,
    /// AI gateway placed in front of the provider
    #[serde(default)]
    pub gateway: AiGatewayConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Session actor settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote tool providers
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Conversation agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System instruction, always the first transcript message
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Chat model
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum model calls per turn while resolving tool calls
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_steps() -> u32 {
    10
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            model: default_model(),
            max_steps: default_max_steps(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Chat-completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

/// AI gateway configuration
///
/// Either a full `url`, or an `account_id` plus gateway `name` from which the
/// hosted gateway endpoint is derived. Leaving both empty talks to the provider
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiGatewayConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "default_gateway_name")]
    pub name: String,
    #[serde(default = "default_gateway_provider")]
    pub provider: String,
    #[serde(default)]
    pub token: String,
}

fn default_gateway_name() -> String {
    "voice-assistant".to_string()
}

fn default_gateway_provider() -> String {
    "openai".to_string()
}

impl Default for AiGatewayConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            account_id: String::new(),
            name: default_gateway_name(),
            provider: default_gateway_provider(),
            token: String::new(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Session actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identifier of the single session actor
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    /// Directory holding persisted conversation state
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Keep a persisted transcript across restarts instead of starting fresh
    #[serde(default)]
    pub resume_persisted: bool,
}

fn default_agent_id() -> String {
    "siri-user-session".to_string()
}

fn default_state_dir() -> String {
    "~/.voice-assistant/state".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            state_dir: default_state_dir(),
            resume_persisted: false,
        }
    }
}

/// Tools configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Drop every tool-provider connection after each conversation turn
    #[serde(default = "default_close_after_turn")]
    pub close_after_turn: bool,
    #[serde(default = "default_mcp_servers")]
    pub mcp_servers: HashMap<String, MCPServerConfig>,
}

fn default_close_after_turn() -> bool {
    true
}

fn default_mcp_servers() -> HashMap<String, MCPServerConfig> {
    let mut servers = HashMap::new();
    servers.insert(
        "cloudflare-docs".to_string(),
        MCPServerConfig::new("https://docs.mcp.cloudflare.com/mcp"),
    );
    servers.insert(
        "berlin-transport".to_string(),
        MCPServerConfig::new("https://berlin-transport.mcp-tools.app/mcp"),
    );
    servers
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            close_after_turn: default_close_after_turn(),
            mcp_servers: default_mcp_servers(),
        }
    }
}

impl ToolsConfig {
    /// Enabled servers as `(name, url)` pairs, sorted by name
    pub fn enabled_servers(&self) -> Vec<(String, String)> {
        let mut servers: Vec<(String, String)> = self
            .mcp_servers
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(name, cfg)| (name.clone(), cfg.url.clone()))
            .collect();
        servers.sort();
        servers
    }
}

/// Remote MCP server reachable over streamable HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPServerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl MCPServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            enabled: true,
        }
    }
}

impl Default for MCPServerConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}
