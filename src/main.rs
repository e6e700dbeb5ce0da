//! docrelay - Telegram bot that relays PDF documents to Google Gemini
//!
//! Users send a PDF, get back a point-by-point summary, and can then ask
//! free-form questions about the document.

mod ai;
mod config;
mod dispatcher;
mod runtime;
mod state_machine;
mod store;
mod telegram;

use ai::{GeminiClient, LoggingAi};
use config::Config;
use dispatcher::Dispatcher;
use runtime::ConversationRuntime;
use std::sync::Arc;
use store::InMemoryStore;
use telegram::TelegramApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docrelay=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    let api = Arc::new(TelegramApi::new(&config.telegram_token));
    let ai = LoggingAi::new(Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )));
    let store = InMemoryStore::new(config.max_conversations);

    let runtime = Arc::new(ConversationRuntime::new(
        store,
        ai,
        Arc::clone(&api),
        config.unmatched_policy,
    ));
    let dispatcher = Dispatcher::new(api, runtime);

    tracing::info!(
        model = %config.gemini_model,
        unmatched_policy = ?config.unmatched_policy,
        max_conversations = config.max_conversations,
        "starting update polling"
    );

    tokio::select! {
        () = dispatcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}
