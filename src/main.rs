// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pricing-page grader API server.
//!
//! Serves the account, scan and admin endpoints over the hosted store (or the
//! in-memory store when none is configured).

use pricing_grader::{config::Config, remote::RemoteService, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        scan_delay_ms = config.scan_delay.as_millis() as u64,
        features = ?config.features,
        "Starting pricing grader API"
    );

    let remote = RemoteService::from_config(&config);
    let state = AppState::build(config.clone(), remote);

    let app = pricing_grader::routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sessions.shutdown();
    state.scans.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pricing_grader=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
