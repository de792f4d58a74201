// main.rs
// Axum server wiring: loads configuration, connects MongoDB (seeding an empty
// database), builds the router and serves.
//
// Endpoints:
// - GET  /                          -> login page
// - POST /login                     -> validates {"email","code"} against the current TOTP
// - POST /logout                    -> drops the session
// - GET  /api/payments              -> filtered invoices for the caller
// - POST /api/payments              -> stores an invoice (admins)
// - PUT  /api/payments/{id}         -> updates an invoice (admins)
// - POST /api/payments/prices       -> derives line prices for an invoice draft
// - GET  /api/domains/my            -> domains visible to the caller
// - GET  /api/services, POST        -> monthly service snapshots
// - GET  /payments/{id}/receipt     -> printable invoice
// - /admin/companies/...            -> company management pages

use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spacehub::{config::AppConfig, routes, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(&config);

    let state = Arc::new(
        state::init_state(&config)
            .await
            .context("failed to initialize MongoDB state")?,
    );

    let app = routes::router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, db = %config.mongodb_db, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
