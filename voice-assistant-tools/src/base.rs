//! Base traits for tools and tool sources

use async_trait::async_trait;
use serde_json::Value;

use crate::registry::ToolRegistry;

/// Trait for tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the tool parameters schema (JSON Schema format)
    fn parameters(&self) -> Value;

    /// Execute the tool with arguments
    async fn execute(&self, args: Value) -> Result<String>;

    /// Validate parameters against the schema
    ///
    /// Only the top-level `required` list is checked.
    fn validate_params(&self, params: &Value) -> Vec<String> {
        let Some(params_obj) = params.as_object() else {
            return vec!["Parameters must be an object".to_string()];
        };

        let schema = self.parameters();
        let mut errors = Vec::new();

        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for field_name in required.iter().filter_map(|f| f.as_str()) {
                if !params_obj.contains_key(field_name) {
                    errors.push(format!("Missing required field: {}", field_name));
                }
            }
        }

        errors
    }

    /// Convert tool to OpenAI function schema format
    fn to_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// A set of remote tool providers the session can register and draw tools from
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Register a provider and connect to it, returning the number of tools it exposes
    async fn add_server(&self, name: &str, url: &str) -> Result<usize>;

    /// Tools of every registered provider, reconnecting closed providers first
    async fn tools(&self) -> ToolRegistry;

    /// Drop every open provider connection; registrations are kept
    async fn close_all_connections(&self);
}

/// Tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool error: {0}")]
    Error(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
