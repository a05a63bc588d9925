//! YRB scenario server binary.
//!
//! Loads the configuration, builds the series client and pipeline, and
//! serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! # In-memory catalog, optionally loaded from a JSON snapshot
//! cargo run --bin yrb-server
//!
//! # Remote scenario API
//! SERIES_API_URL=http://127.0.0.1:8000 \
//!   cargo run --bin yrb-server --features "http-server,http-client"
//! ```
//!
//! # Environment Variables
//!
//! - `SCENARIOS_CONFIG`: Path to the TOML configuration (default: search `scenarios.toml`)
//! - `SERIES_CLIENT_TYPE`: `local` or `http`
//! - `SERIES_API_URL`: Base URL of the remote scenario API
//! - `SERIES_CACHE_CAPACITY`: Cache entries, or `unbounded`
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use yrb_scenarios::client::ClientFactory;
use yrb_scenarios::config::AppConfig;
use yrb_scenarios::http::{create_router, AppState};
use yrb_scenarios::models::QueryOptions;
use yrb_scenarios::params::ParameterStore;
use yrb_scenarios::services::{ScenarioSeriesCache, SeriesPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting YRB scenario server");

    let config = match env::var("SCENARIOS_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.apply_env_overrides()?,
        Err(_) => AppConfig::load()?,
    };

    let client = ClientFactory::from_config(&config)?;
    info!("Series client initialized ({})", config.client.client_type);

    let cache = Arc::new(ScenarioSeriesCache::with_capacity(
        config.cache.effective_capacity(),
    ));
    let store = ParameterStore::new(config.initial_snapshot());
    let options = QueryOptions {
        window: config.window()?,
        aggregate: config.series.aggregate,
    };
    let pipeline = SeriesPipeline::with_options(store, client, cache, options, config.translator());
    if !config.series.watch.is_empty() {
        pipeline.watch(config.series.watch.iter().cloned());
        info!("Watching {} variables for parameter updates", config.series.watch.len());
    }

    let state = AppState::new(pipeline, config.series.baseline_year);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
