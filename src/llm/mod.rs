//! Text-generation integration.
//!
//! - `provider`: the `LlmProvider` trait and request/response types
//! - `openai`: reqwest client for the completions endpoint
//! - `rephrase`: the retrying, always-succeeding phrasing gateway

pub mod openai;
pub mod provider;
pub mod rephrase;

pub use openai::OpenAiCompletions;
pub use provider::*;
pub use rephrase::Rephraser;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiCompletions::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.timeout,
    )?;
    tracing::info!("Using completions endpoint (model: {})", config.model);
    Ok(Arc::new(provider))
}
