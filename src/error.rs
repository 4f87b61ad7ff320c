//! Error types for the insurance bot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to download file {file_ref} on channel {name}: {reason}")]
    DownloadFailed {
        name: String,
        file_ref: String,
        reason: String,
    },
}

/// Text-generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Document-extraction errors that are not recovered by the fallback record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request for {document} failed: {reason}")]
    Request { document: String, reason: String },

    #[error("Extraction service returned {status} for {document}")]
    Status { document: String, status: u16 },

    #[error("Invalid extraction response for {document}: {reason}")]
    InvalidResponse { document: String, reason: String },

    #[error("Photo download failed: {0}")]
    PhotoDownload(#[from] ChannelError),

    #[error("Missing photo reference for {document}")]
    MissingPhoto { document: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
