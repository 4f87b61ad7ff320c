//! HTTP client for the legacy completions endpoint.
//!
//! Request: `{model, messages, max_tokens}`. Response: `{choices: [{text}]}`.
//! A 429 status is reported as `LlmError::RateLimited`; every other failure
//! as `RequestFailed` or `InvalidResponse`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};

const PROVIDER: &str = "openai";

/// Completions client for an OpenAI-compatible endpoint.
pub struct OpenAiCompletions {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiCompletions {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CompletionsBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionsReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiCompletions {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = CompletionsBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {}", detail.chars().take(200).collect::<String>()),
            });
        }

        let reply: CompletionsReply = resp.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        Ok(CompletionResponse {
            content: first_text(reply),
        })
    }
}

/// Text of the first choice, trimmed; `None` when missing or blank.
fn first_text(reply: CompletionsReply) -> Option<String> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
