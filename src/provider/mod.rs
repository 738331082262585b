//! Abstract text-generation capability
//!
//! Both external endpoints (the reasoning/chat provider and the
//! search-augmented research provider) are treated as one capability:
//! `generate(messages, model) -> text`. Stages depend only on the
//! [`Provider`] trait so tests can inject a scripted fake.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpProvider;

/// Role tag on a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a provider request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generated text plus any citation URLs the provider attached
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub citations: Vec<String>,
}

/// Errors surfaced by a provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Rate limits, timeouts, connection failures, 5xx responses
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Anything that will not improve on retry (4xx besides 429, bad payloads)
    #[error("provider request failed: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// External text-generation capability used by every stage
#[async_trait]
pub trait Provider: Send + Sync {
    /// Issue one synchronous generation request
    async fn generate(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> std::result::Result<Completion, ProviderError>;
}

/// Bounded exponential backoff for transient provider errors
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// Budget for the parallel researcher: 2 retries per query
    pub fn research() -> Self {
        Self {
            max_retries: 2,
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(15),
        }
    }

    /// Backoff delay before the given retry (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = self
            .min_wait
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        exp.min(self.max_wait)
    }
}

/// Call the provider, retrying transient failures per the policy.
///
/// Fatal errors are returned immediately; a transient error that survives the
/// whole budget is returned as-is for the caller to convert.
pub async fn generate_with_retries(
    provider: &dyn Provider,
    messages: &[ChatMessage],
    model: &str,
    policy: RetryPolicy,
) -> std::result::Result<Completion, ProviderError> {
    let mut attempt: u32 = 0;
    loop {
        match provider.generate(messages, model).await {
            Ok(completion) => return Ok(completion),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let wait = policy.delay(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}
