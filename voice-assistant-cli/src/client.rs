use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use voice_assistant_core::session::SessionStatus;

/// HTTP client for a running voice-assistant server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TextResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one utterance and return the assistant reply
    pub async fn say(&self, text: &str) -> Result<String> {
        let url = format!("{}/text", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("Server returned {}: {}", status, error_message(response).await);
        }

        let body: TextResponse = response.json().await?;
        Ok(body.response)
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            bail!("Server returned {}: {}", status, error_message(response).await);
        }

        Ok(response.json().await?)
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}
