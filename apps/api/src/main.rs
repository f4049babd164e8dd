mod config;
mod embedding;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::{Embedder, HashEmbedder, HttpEmbedder};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shortlist API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.provider_timeout(),
    )
    .context("failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    let embedder = build_embedder(&config)?;
    info!("Embedder initialized ({})", embedder.name());

    let state = AppState {
        llm: Arc::new(llm),
        embedder,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote embedder when an endpoint is configured, the local hashing embedder otherwise.
fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match &config.embedding_api_url {
        Some(url) => {
            let embedder = HttpEmbedder::new(
                url.clone(),
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
                config.provider_timeout(),
            )
            .context("failed to build embedding client")?;
            Ok(Arc::new(embedder))
        }
        None => {
            let embedder = HashEmbedder::default();
            info!(
                "No EMBEDDING_API_URL set, using local hashing embedder ({} dims)",
                embedder.dimension()
            );
            Ok(Arc::new(embedder))
        }
    }
}
