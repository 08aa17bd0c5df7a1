use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use finance_tracker::assistant::OpenRouterClient;
use finance_tracker::config::Config;
use finance_tracker::db::{MongoStore, connect_to_mongo};
use finance_tracker::mail::SmtpMailer;
use finance_tracker::store::Store;
use finance_tracker::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("finance_tracker=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let db = connect_to_mongo(&config)
        .await
        .context("failed to connect to MongoDB")?;
    tracing::info!(database = %config.database_name, "connected to MongoDB");
    let store = MongoStore::new(db);
    store.ensure_indexes().await.context("failed to create indexes")?;
    tracing::info!(backend = store.backend_tag(), "store ready");

    let mailer = SmtpMailer::from_config(&config.mail).context("invalid mail settings")?;
    if config.assistant.api_key.is_none() {
        tracing::warn!("LLM_API_KEY not set, the finance assistant will answer only ledger questions");
    }
    let assistant = OpenRouterClient::new(&config.assistant);

    let bind_addr = config.bind_addr;
    let state = AppState {
        store: Arc::new(store),
        mailer: Arc::new(mailer),
        assistant: Arc::new(assistant),
        config: Arc::new(config),
    };

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
