mod ai;
mod analysis;
mod config;
mod db;
mod embeddings;
mod errors;
mod models;
mod postings;
mod provider;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::PendingAnalyses;
use crate::config::Config;
use crate::db::create_pool;
use crate::provider::select_provider;
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

    info!("Starting jobwise API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Construct the AI provider eagerly so a missing credential or unsupported
    // provider id halts startup instead of surfacing on the first request.
    let provider = select_provider(config.ai_provider, config.provider_api_key.clone());
    info!("AI provider initialized: {}", provider.kind().as_str());

    // In-flight posting-analysis registry, shared by all requests
    let pending = PendingAnalyses::new();

    // Build app state
    let state = AppState {
        db,
        provider,
        pending,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the extension origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
