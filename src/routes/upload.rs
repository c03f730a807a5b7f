use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::doc_processor;
use crate::error::{Error, Result};
use crate::state::AppState;

/// POST /api/upload - store the `file` field in the upload directory
///
/// An existing file with the same name is replaced.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(doc_processor::sanitize_file_name)
            .ok_or_else(|| Error::bad_request("upload has no usable file name"))?;
        let data = field.bytes().await?;

        let path = doc_processor::store_file(state.upload_dir(), &file_name, &data).await?;
        tracing::info!("Stored upload {} ({} bytes)", path.display(), data.len());
        return Ok(StatusCode::NO_CONTENT);
    }

    Err(Error::bad_request("missing `file` field"))
}
