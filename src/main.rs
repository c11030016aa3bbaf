mod config;
mod db;
mod error;
mod scorer;
mod types;
mod api;

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::{seed, MarketplaceStore, RequestSweeper};
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let store = MarketplaceStore::new(pool);

    // --- Demo fixtures (opt-in via SEED_DEMO_DATA) ---
    if cfg.seed_demo_data {
        seed::install_demo_data(&store, Utc::now()).await?;
    }

    // --- Request lifecycle sweeper ---
    // Sweep once up front so the first match request never scores demand that
    // went stale while the service was down, then keep sweeping on a timer.
    let sweeper = RequestSweeper::new(store.clone());
    sweeper.sweep().await?;
    tokio::spawn(async move { sweeper.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        store,
        health: Arc::new(HealthState::new()),
        latency: Arc::new(LatencyStats::new()),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
