//! HTTP routes

pub mod chat;
pub mod documents;
pub mod ui;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Routes under `/api`
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
}
