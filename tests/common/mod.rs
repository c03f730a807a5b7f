#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use futures::StreamExt;
use hire_power::embedding::Embedder;
use hire_power::llm::{ChatMessage, ChatModel, LlmError, TokenStream};
use hire_power::{AppConfig, AppState};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Chat model that answers from a script and records every prompt.
#[derive(Default)]
pub struct FakeChat {
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn answer_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with("You are an assistant helping to hire"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages[0].content.clone());
        Ok("Which candidate knows Rust?".to_string())
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, LlmError> {
        self.prompts.lock().unwrap().push(messages[0].content.clone());
        let tokens = vec![Ok("Hello".to_string()), Ok(", I can help.".to_string())];
        Ok(futures::stream::iter(tokens).boxed())
    }

    fn model(&self) -> &str {
        "fake-chat"
    }
}

/// Keyword-presence vectors
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                ["rust", "python", "java"]
                    .iter()
                    .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                    .chain(std::iter::once(0.1))
                    .collect()
            })
            .collect())
    }
}

pub fn test_config(upload_dir: &Path, top_k: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.upload_dir = upload_dir.to_path_buf();
    config.retrieval.top_k = top_k;
    config
}

pub fn test_state(upload_dir: &Path, top_k: usize) -> (AppState, Arc<FakeChat>) {
    state_with_config(test_config(upload_dir, top_k))
}

pub fn state_with_config(config: AppConfig) -> (AppState, Arc<FakeChat>) {
    let chat = Arc::new(FakeChat::default());
    let state = AppState::new(config, chat.clone(), Arc::new(FakeEmbedder));
    (state, chat)
}

pub fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "hire-power-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Single-page PDF showing `text`
pub fn build_pdf(text: &str) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
