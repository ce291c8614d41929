//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.agent.system_prompt.trim().is_empty() {
        errors.push("agent.system_prompt must not be empty".to_string());
    }
    if config.agent.model.trim().is_empty() {
        errors.push("agent.model must not be empty".to_string());
    }
    if config.agent.max_steps == 0 {
        errors.push("agent.max_steps must be > 0".to_string());
    }
    if config.agent.max_tokens == 0 {
        errors.push("agent.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.agent.temperature) {
        errors.push("agent.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.session.agent_id.trim().is_empty() {
        errors.push("session.agent_id must not be empty".to_string());
    }

    for (name, server) in &config.tools.mcp_servers {
        if !server.enabled {
            continue;
        }
        let url = server.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "tools.mcp_servers.{} must set an http(s) url",
                name
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
