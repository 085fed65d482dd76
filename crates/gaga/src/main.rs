use std::sync::Arc;

use gaga_ai::{GeminiClient, OpenAiClient};
use gaga_core::{
    bot::{Bot, BotOptions, Collaborators},
    config::Config,
    media::HttpMediaSource,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    ports::CompletionClient,
};
use gaga_whatsapp::{
    router::{serve, AppState},
    WhatsAppApiConfig, WhatsAppMessenger,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), gaga_core::Error> {
    gaga_core::logging::init("gaga")?;

    let cfg = Config::load()?;

    // Throttle below the Cloud API's pair rate limit; 429s are still retried
    // once inside the adapter.
    let raw: Arc<dyn MessagingPort> =
        Arc::new(WhatsAppMessenger::new(WhatsAppApiConfig::from_config(&cfg))?);
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(ThrottledMessenger::new(raw, ThrottleConfig::default()));

    let openai: Option<Arc<dyn CompletionClient>> = match &cfg.openai_api_key {
        Some(key) => Some(Arc::new(
            OpenAiClient::new(key.clone())?.with_model(cfg.openai_model.clone()),
        )),
        None => None,
    };
    let gemini: Option<Arc<dyn CompletionClient>> = match &cfg.gemini_api_key {
        Some(key) => Some(Arc::new(
            GeminiClient::new(key.clone())?.with_model(cfg.gemini_model.clone()),
        )),
        None => None,
    };
    info!(
        openai = openai.is_some(),
        gemini = gemini.is_some(),
        owners = cfg.owner_numbers.len(),
        "starting gaga"
    );

    let bot = Arc::new(Bot::assemble(
        BotOptions::from_config(&cfg),
        Collaborators {
            messenger,
            media: Arc::new(HttpMediaSource::new(cfg.max_media_bytes)?),
            openai,
            gemini,
        },
    )?);

    serve(&cfg.bind_addr, AppState::new(bot.clone(), &cfg))
        .await
        .map_err(|e| gaga_core::Error::External(format!("webhook server failed: {e}")))?;

    bot.reminders().shutdown();
    info!("gaga stopped");
    Ok(())
}
