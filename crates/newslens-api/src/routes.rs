//! Router setup and server lifecycle.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use newslens_core::config::NewslensConfig;
use newslens_core::error::NewslensError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/search", post(handlers::search))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on the configured address until `shutdown` resolves.
pub async fn start_server<S>(
    config: &NewslensConfig,
    state: AppState,
    shutdown: S,
) -> Result<(), NewslensError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NewslensError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
