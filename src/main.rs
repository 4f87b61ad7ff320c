use std::sync::Arc;

use secrecy::ExposeSecret;

use car_insurance_bot::bot::Bot;
use car_insurance_bot::channels::{Channel, PhotoSource, TelegramChannel};
use car_insurance_bot::config::BotConfig;
use car_insurance_bot::conversation::{ConversationEngine, Conversations, InMemorySessionStore};
use car_insurance_bot::extraction::ExtractionGateway;
use car_insurance_bot::extraction::mindee::MindeeClient;
use car_insurance_bot::llm::{LlmConfig, Rephraser, create_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🚗 Car Insurance Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!(
        "   Telegram allowed: {}",
        if config.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else {
            config.allowed_users.join(", ")
        }
    );
    eprintln!("   Max concurrent turns: {}\n", config.max_concurrent_turns);

    // ── Phrasing gateway ───────────────────────────────────────────────
    let llm = create_provider(&LlmConfig {
        base_url: config.openai_base_url.clone(),
        api_key: config.openai_api_key.clone(),
        model: config.model.clone(),
        timeout: config.http_timeout,
    })?;
    let rephraser = Arc::new(Rephraser::new(llm).with_base_delay(config.retry_base_delay));

    // ── Extraction gateway ─────────────────────────────────────────────
    let mindee = MindeeClient::new(
        config.mindee_base_url.clone(),
        config.mindee_api_key.clone(),
        config.http_timeout,
    )?;
    let extraction = Arc::new(ExtractionGateway::new(Arc::new(mindee)));

    // ── Channel ────────────────────────────────────────────────────────
    let telegram = Arc::new(
        TelegramChannel::new(
            config.telegram_token.expose_secret().to_string(),
            config.allowed_users.clone(),
        )?
        .with_request_timeout(config.http_timeout),
    );
    if let Err(e) = telegram.health_check().await {
        tracing::warn!("Telegram health check failed: {e}");
    }

    // ── Conversations ──────────────────────────────────────────────────
    let photos: Arc<dyn PhotoSource> = telegram.clone();
    let engine = ConversationEngine::new(rephraser, extraction, photos)
        .with_phrasing_retries(config.phrasing_retries);
    let conversations = Arc::new(
        Conversations::new(engine, Arc::new(InMemorySessionStore::new()))
            .with_max_concurrent_turns(config.max_concurrent_turns),
    );

    let channel: Arc<dyn Channel> = telegram;
    Bot::new(channel, conversations).run().await?;

    Ok(())
}
