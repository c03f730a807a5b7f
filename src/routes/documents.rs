use axum::{extract::State, Json};

use crate::doc_processor::{self, StoredFile};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/documents - files that make up the corpus
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<StoredFile>>> {
    let dir = state.upload_dir();
    if !tokio::fs::try_exists(dir).await? {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(doc_processor::list_files(dir).await?))
}
