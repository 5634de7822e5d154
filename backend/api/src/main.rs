//! Franchise API — entry point.
//!
//! Wires configuration, the SQLite pool, and the HTTP transaction verifier
//! into the Axum router and serves it.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use franchise_api::api::{self, ApiState};
use franchise_api::config::Config;
use franchise_api::db;
use franchise_api::payments::HttpVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let verifier = HttpVerifier::new(client, config.verifier_url.clone());

    let addr = format!("0.0.0.0:{}", config.api_port);
    let state = Arc::new(ApiState {
        pool,
        config,
        verifier,
    });
    let app = api::router(state);

    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
