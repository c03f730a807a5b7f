//! HTTP server

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::{Error, Result};
use crate::routes;
use crate::state::AppState;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config().server.clone();

    let router = Router::new()
        .route("/", get(routes::ui::index))
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes(config.max_upload_size))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Bind and serve until Ctrl+C
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .config()
        .address()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

    tokio::fs::create_dir_all(state.upload_dir()).await?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> &'static str {
    "OK"
}
