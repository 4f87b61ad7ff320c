//! Phrasing gateway: turns fixed template strings into natural replies.
//!
//! Every failure degrades to the input text: rate limiting is retried with a
//! linear backoff (`attempt × base_delay`) up to `max_retries` total attempts,
//! any other error returns the input immediately.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Default base delay between rate-limited attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Best-effort paraphrasing layer over an `LlmProvider`.
pub struct Rephraser {
    llm: Arc<dyn LlmProvider>,
    base_delay: Duration,
}

impl Rephraser {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Paraphrase `input`, falling back to `input` itself on any failure.
    pub async fn rephrase(&self, input: &str, max_retries: u32) -> String {
        let attempts = max_retries.max(1);

        for attempt in 1..=attempts {
            debug!(attempt, model = self.llm.model_name(), "Requesting paraphrase");
            let request = CompletionRequest::new(vec![ChatMessage::user(input)]);

            match self.llm.complete(request).await {
                Ok(response) => {
                    return match response.content {
                        Some(text) => text,
                        None => {
                            warn!("Paraphrase response had no text; using template");
                            input.to_string()
                        }
                    };
                }
                Err(LlmError::RateLimited { .. }) => {
                    warn!(attempt, "Paraphrase rate limited");
                    if attempt < attempts {
                        tokio::time::sleep(self.base_delay * attempt).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Paraphrase failed; using template");
                    return input.to_string();
                }
            }
        }

        warn!(attempts, "Paraphrase retries exhausted; using template");
        input.to_string()
    }
}
