/// Ollama HTTP API client for narrative insights.
///
/// Talks to an Ollama instance using the synchronous `ureq` client:
///
/// - **Health check**: `GET /api/tags`, true when at least one model is loaded.
/// - **Chat**: `POST /api/chat` with `format: "json"`, so the model is
///   constrained to emit a JSON object that [`super::validation`] can parse.
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::schema::InsightConfig;

// ---------------------------------------------------------------------------
// Request / response types for the Ollama API
// ---------------------------------------------------------------------------

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    format: &'a str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from `POST /api/chat` (non-streaming).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Response body from `GET /api/tags`.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<serde_json::Value>,
}

/// Response token budget. Insights are a paragraph plus two short lists.
const RESPONSE_BUDGET: u32 = 1024;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous Ollama HTTP client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Build a client from the resolved insight config.
    pub fn from_config(config: &InsightConfig) -> Self {
        Self {
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Check whether Ollama is reachable and has at least one model loaded.
    pub fn is_healthy(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match ureq::get(&url).timeout(Duration::from_secs(5)).call() {
            Ok(resp) => resp
                .into_json::<TagsResponse>()
                .map(|tags| !tags.models.is_empty())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Send chat messages and return the assistant's raw JSON text.
    ///
    /// Temperature is kept low so repeated analyses of the same data read
    /// consistently.
    pub fn chat_json(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: 0.2,
                num_predict: RESPONSE_BUDGET,
            },
        };

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(&body)
            .context("Ollama chat request failed")?;

        let parsed: ChatResponse = resp
            .into_json()
            .context("failed to parse Ollama chat response")?;

        if parsed.message.content.trim().is_empty() {
            anyhow::bail!("Ollama returned an empty response");
        }

        Ok(parsed.message.content)
    }

    /// Return the model name for display.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let client = OllamaClient::from_config(&InsightConfig::default());
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model_name(), "llama3.2:3b");
        assert_eq!(client.timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn client_strips_trailing_slash() {
        let config = InsightConfig {
            ollama_url: "http://gpu-box:11434/".to_string(),
            ..InsightConfig::default()
        };
        assert_eq!(
            OllamaClient::from_config(&config).base_url(),
            "http://gpu-box:11434"
        );
    }

    #[test]
    fn chat_request_serializes_json_format() {
        let messages = [ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: 0.2,
                num_predict: RESPONSE_BUDGET,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
