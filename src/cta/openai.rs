//! Backend for a local OpenAI-compatible inference server.
//!
//! Completions are requested with `stream: true` from
//! `/v1/chat/completions`; the server answers with server-sent events,
//! one `data: {json}` line per delta and `data: [DONE]` at the end.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::engine::{
    ChatMessage, ChatRequest, EngineBackend, EngineError, InferenceEngine, ResponseFormat,
    TextStream,
};

/// Model requested when none is configured.
pub const DEFAULT_MODEL: &str = "Llama-3.2-1B-Instruct-q4f16_1-MLC";

/// Connection settings for the inference server.
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// [`EngineBackend`] for an OpenAI-compatible HTTP server.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    endpoint: Endpoint,
}

impl OpenAiCompatibleBackend {
    /// Backend for the server at `base_url` (e.g. `http://127.0.0.1:8080`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: Endpoint {
                http: reqwest::Client::new(),
                base_url: base_url.trim().trim_end_matches('/').to_string(),
                model: DEFAULT_MODEL.to_string(),
                api_key: None,
            },
        }
    }

    /// Requests `model` instead of [`DEFAULT_MODEL`].
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.endpoint.model = model.into();
        self
    }

    /// Sends `key` as a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl EngineBackend for OpenAiCompatibleBackend {
    fn is_supported(&self) -> bool {
        url::Url::parse(&self.endpoint.base_url)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }

    async fn load(
        &self,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        progress(0.0);
        let response = self
            .endpoint
            .authorize(self.endpoint.http.get(self.endpoint.url("/v1/models")))
            .send()
            .await
            .map_err(|e| EngineError::Load(e.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::Load(format!(
                "model listing returned status {}",
                response.status().as_u16()
            )));
        }
        progress(1.0);
        tracing::debug!(base_url = %self.endpoint.base_url, model = %self.endpoint.model, "inference server reachable");

        Ok(Arc::new(OpenAiCompatibleEngine {
            endpoint: self.endpoint.clone(),
        }))
    }
}

/// Engine talking to a reachable OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleEngine {
    endpoint: Endpoint,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

#[async_trait]
impl InferenceEngine for OpenAiCompatibleEngine {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, EngineError> {
        let body = CompletionBody {
            model: &self.endpoint.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            response_format: request.response_format.as_ref(),
        };
        let response = self
            .endpoint
            .authorize(
                self.endpoint
                    .http
                    .post(self.endpoint.url("/v1/chat/completions")),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::Request(format!(
                "completion returned status {}",
                response.status().as_u16()
            )));
        }

        let mut decoder = SseDeltaDecoder::default();
        let deltas = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(EngineError::Stream(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter);
        Ok(Box::pin(deltas))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Turns raw SSE bytes into content deltas.
///
/// Bytes are buffered until a full line arrives, so chunk boundaries may
/// fall anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDeltaDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl SseDeltaDecoder {
    /// Feeds bytes and returns the non-empty deltas completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut deltas = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if self.done {
                continue;
            }
            if let Some(delta) = self.decode_line(&String::from_utf8_lossy(&line)) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Whether the `[DONE]` sentinel was seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, line: &str) -> Option<String> {
        let data = line.trim().strip_prefix("data:")?.trim();
        if data == "[DONE]" {
            self.done = true;
            return None;
        }
        let chunk: CompletionChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable completion chunk");
                return None;
            }
        };
        let delta: String = chunk
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .collect();
        (!delta.is_empty()).then_some(delta)
    }
}
