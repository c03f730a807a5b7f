use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Instant;

use crate::chain::ConversationalChain;
use crate::doc_processor;
use crate::error::{Error, Result};
use crate::llm::ChatMessage;
use crate::state::AppState;
use crate::vector_store::MemoryIndex;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

/// POST /api/chat - answer the last message from the uploaded resumes
///
/// The index is rebuilt from the upload directory on every call.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| Error::bad_request(e.body_text()))?;
    let messages = request
        .messages
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::bad_request("request body must contain a non-empty `messages` array"))?;

    let start = Instant::now();
    let documents = doc_processor::load_directory(state.upload_dir()).await?;
    let document_count = documents.len();
    let index =
        MemoryIndex::from_documents(documents, state.embedder(), &state.config().retrieval).await?;

    let chain = ConversationalChain::new(
        state.chat_model(),
        &index,
        state.config().retrieval.top_k,
    );
    let tokens = chain.stream(&messages).await?;

    tracing::info!(
        "Chat turn over {} documents ({} chunks) with {}, streaming after {:.1}s",
        document_count,
        index.len(),
        state.chat_model().model(),
        start.elapsed().as_secs_f64()
    );

    let body = Body::from_stream(tokens.map(|token| {
        if let Err(e) = &token {
            tracing::error!("Answer stream failed: {}", e);
        }
        token
    }));

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}
