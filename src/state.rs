//! Shared application state

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::embedding::{Embedder, OpenAiEmbeddings};
use crate::llm::openai::OpenAiChat;
use crate::llm::ChatModel;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    chat_model: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        chat_model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                chat_model,
                embedder,
            }),
        }
    }

    /// State backed by the OpenAI-compatible API named in `config`.
    pub fn from_config(config: AppConfig) -> Self {
        let client = reqwest::Client::new();
        let chat_model = Arc::new(OpenAiChat::new(client.clone(), config.openai.clone()));
        let embedder = Arc::new(OpenAiEmbeddings::new(client, config.openai.clone()));
        Self::new(config, chat_model, embedder)
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn chat_model(&self) -> &dyn ChatModel {
        self.inner.chat_model.as_ref()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.inner.embedder)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner.config.storage.upload_dir
    }
}
