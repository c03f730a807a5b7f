use super::{ChatMessage, ChatModel, LlmError, TokenStream};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiStreamResponse {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

/// POST to `{base_url}/{path}`, with a bearer token when one is configured.
pub(crate) fn post(client: &Client, config: &OpenAiConfig, path: &str) -> RequestBuilder {
    let req = client
        .post(format!("{}/{}", config.base_url, path))
        .header("Content-Type", "application/json");

    if config.api_key.is_empty() {
        req
    } else {
        req.header("Authorization", format!("Bearer {}", config.api_key))
    }
}

/// Turn a non-2xx reply into `LlmError::Api`.
pub(crate) async fn check_status(resp: Response) -> Result<Response, LlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status,
        message: text,
    })
}

/// Chat completions against an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChat {
    pub fn new(client: Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<Response, LlmError> {
        let body = OpenAiRequest {
            model: &self.config.chat_model,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
            temperature: self.config.temperature,
            stream,
        };

        let resp = post(&self.client, &self.config, "chat/completions")
            .json(&body)
            .send()
            .await?;
        check_status(resp).await
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let resp = self.send(messages, false).await?;
        let data: OpenAiResponse = resp.json().await?;
        Ok(data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, LlmError> {
        let resp = self.send(messages, true).await?;
        Ok(decode_event_stream(resp.bytes_stream().boxed()))
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}

/// Incremental decoder for the `data:` lines of a completion event stream.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
        }
    }

    /// Flush a trailing line without newline and stop.
    fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&String::from_utf8_lossy(&line));
        }
        self.done = true;
    }

    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        let Some(data) = line.trim().strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return;
        }

        match serde_json::from_str::<OpenAiStreamResponse>(data) {
            Ok(parsed) => {
                if let Some(choice) = parsed.choices.into_iter().next() {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        self.pending.push_back(content);
                    }
                    if choice.finish_reason.is_some() {
                        self.done = true;
                    }
                }
            }
            Err(e) => tracing::debug!("Skipping undecodable stream event: {}", e),
        }
    }
}

fn decode_event_stream(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> TokenStream {
    stream::unfold(
        (bytes, SseDecoder::default()),
        |(mut bytes, mut decoder)| async move {
            loop {
                if let Some(delta) = decoder.pending.pop_front() {
                    return Some((Ok(delta), (bytes, decoder)));
                }
                if decoder.done {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => {
                        decoder.done = true;
                        return Some((Err(LlmError::Http(e)), (bytes, decoder)));
                    }
                    None => decoder.finish(),
                }
            }
        },
    )
    .boxed()
}
