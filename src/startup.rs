//! Application startup and server initialization.
//!
//! Connects the store, builds the shared state and router, starts the
//! cleanup job and serves HTTP until the process is stopped.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::cleanup::start_cleanup_job;
use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;
use crate::store::connect_db;

/// Builds the shared state and router for `config`.
pub async fn build_app(config: Arc<ServerConfig>) -> Result<(Router, AppState), String> {
    let store = connect_db(&config.store_backend()).await?;
    let state = AppState::new(config, store);
    Ok((routes::create_router(state.clone()), state))
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the store cannot be reached, the listener cannot bind
/// to the configured address, or the server fails while running.
pub async fn run(config: Arc<ServerConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let (app, state) = build_app(config.clone()).await?;

    let cleanup = start_cleanup_job(
        &config.cleanup,
        state.store.clone(),
        state.limiter.clone(),
    );

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    info!(
        "Email service: {}",
        config.email_service.as_deref().unwrap_or("Not configured")
    );
    info!(
        "Database: {}",
        if state.store.is_persistent() {
            "Connected"
        } else {
            "Not configured"
        }
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;

    if let Some(handle) = cleanup {
        handle.abort();
    }
    served?;
    Ok(())
}
