// ABOUTME: HTTP server bootstrap
// ABOUTME: Opens the database, layers CORS and request tracing over the API router, and serves it

use axum::http::{HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use ecflow_api::{create_router, AppState};
use ecflow_storage::{init_with_path, StorageError};

use crate::config::Config;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// The API router with the server's cross-cutting layers applied
pub fn build_app(state: AppState, config: &Config) -> Result<Router, ServerError> {
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| ServerError::InvalidOrigin(config.cors_origin.clone()))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    Ok(create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let pool = init_with_path(Some(config.database_path.clone())).await?;
    info!("Database ready at {}", config.database_path.display());

    let state = AppState::new(pool).with_activity_limit(config.activity_limit);
    let app = build_app(state, &config)?;

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
