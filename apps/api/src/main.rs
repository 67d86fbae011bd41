mod config;
mod errors;
mod events;
mod humanize;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::events::EventLog;
use crate::humanize::client::HumanizerClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Humanizer API v{}", env!("CARGO_PKG_VERSION"));

    if config.humanize_api_key.trim().is_empty() {
        warn!("HUMANIZE_API_KEY not set; humanize requests will be rejected");
    }

    // Initialize the JSONL event log
    let events = EventLog::open(&config.event_log_path);
    info!("Event log at {}", config.event_log_path);

    // Initialize the shared rewrite client
    let humanizer = Arc::new(HumanizerClient::new(&config, events.clone()));
    info!(
        "Humanizer client initialized (url: {}, max_concurrent: {}, retries: {})",
        config.humanize_api_url, config.humanize_max_concurrent, config.humanize_retries
    );

    // Build app state
    let state = AppState {
        humanizer,
        events,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
