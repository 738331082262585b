//! HTTP provider over OpenAI-compatible chat completion endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, Completion, Provider, ProviderError};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// Client for one OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct HttpProvider {
    name: &'static str,
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpProvider {
    /// Reasoning/chat provider (OpenAI-compatible)
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key)
    }

    /// Search-augmented research provider (Perplexity-compatible)
    pub fn perplexity(api_key: impl Into<String>) -> Self {
        Self::new("perplexity", PERPLEXITY_BASE_URL, api_key)
    }

    /// Build a provider against an arbitrary base URL
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Provider for HttpProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest { model, messages };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Transient(format!("[{}] {}", self.name, e))
                } else {
                    ProviderError::Fatal(format!("[{}] {}", self.name, e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transient(format!(
                "[{}] status {}: {}",
                self.name, status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Fatal(format!(
                "[{}] status {}: {}",
                self.name, status, body
            )));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            ProviderError::Fatal(format!("[{}] invalid response body: {}", self.name, e))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::Fatal(format!("[{}] response contained no choices", self.name))
            })?;

        Ok(Completion {
            text,
            citations: parsed.citations,
        })
    }
}
