// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use genome_analyzer::api_handler::{APIHandler, TokioSleeper};
use genome_analyzer::config::AppConfig;
use genome_analyzer::routes::{self, AppState, ANALYZE_PATH};
use genome_analyzer::service::AnalysisService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!(
        "Starting genome analyzer on {} (engine: {})",
        config.bind_addr,
        config.engine.as_str()
    );
    if config.gemini.default_api_key.is_none() {
        info!("ALPHAGENOME_API_KEY not set; requests must carry their own apiKey");
    }

    let transport = Arc::new(APIHandler::new().context("failed to build HTTP client")?);
    let service = AnalysisService::from_config(&config, transport, Arc::new(TokioSleeper));
    let app = routes::router(Arc::new(AppState { service }));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening for POST {}", ANALYZE_PATH);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
