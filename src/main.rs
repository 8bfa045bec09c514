mod api;
mod clients;
mod config;
mod engine;
mod error;
mod geo;
mod models;
mod observability;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::clients::driver_directory::HttpDriverDirectory;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let driver_directory = HttpDriverDirectory::new(
        config.driver_service_url.clone(),
        config.driver_http_timeout(),
        config.driver_http_retries,
        config.driver_http_retry_delay(),
    )
    .map_err(|err| error::AppError::Internal(format!("driver directory client: {err}")))?;

    let shared_state = Arc::new(state::AppState::new(Arc::new(driver_directory)));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::scheduler::run_scheduler(
        shared_state.clone(),
        config.assignment_interval(),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
