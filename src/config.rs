//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default text-generation model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
/// Default text-generation API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default document-extraction API base URL.
pub const DEFAULT_MINDEE_BASE_URL: &str = "https://api.mindee.net";

/// Bot configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub telegram_token: SecretString,
    /// Usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// Extraction service API key.
    pub mindee_api_key: SecretString,
    pub mindee_base_url: String,
    /// Text-generation service API key.
    pub openai_api_key: SecretString,
    pub openai_base_url: String,
    pub model: String,
    /// Per-call timeout applied to both external services.
    pub http_timeout: Duration,
    /// Total attempts made by the phrasing gateway on rate limiting.
    pub phrasing_retries: u32,
    /// Base delay of the linear rate-limit backoff.
    pub retry_base_delay: Duration,
    /// Maximum number of turns handled concurrently.
    pub max_concurrent_turns: usize,
}

impl BotConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<SecretString, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let mindee_api_key = required("MINDEE_API_KEY")?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        let allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let http_timeout_secs: u64 = parse_or(&lookup, "INSURANCE_BOT_HTTP_TIMEOUT_SECS", 30)?;
        let phrasing_retries: u32 = parse_or(&lookup, "INSURANCE_BOT_PHRASING_RETRIES", 2)?;
        let retry_base_ms: u64 = parse_or(&lookup, "INSURANCE_BOT_RETRY_BASE_MS", 2000)?;
        let max_concurrent_turns: usize =
            parse_or(&lookup, "INSURANCE_BOT_MAX_CONCURRENT_TURNS", 32)?;

        if max_concurrent_turns == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INSURANCE_BOT_MAX_CONCURRENT_TURNS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            telegram_token,
            allowed_users,
            mindee_api_key,
            mindee_base_url: lookup("MINDEE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MINDEE_BASE_URL.to_string()),
            openai_api_key,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: lookup("INSURANCE_BOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            phrasing_retries,
            retry_base_delay: Duration::from_millis(retry_base_ms),
            max_concurrent_turns,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
