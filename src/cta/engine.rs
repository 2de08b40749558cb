//! Inference engine abstraction and lifecycle.
//!
//! An [`EngineBackend`] knows whether it can run in the current
//! environment and how to load an [`InferenceEngine`]. [`EngineService`]
//! owns the loaded engine, makes concurrent `initialize` calls share one
//! load, and publishes [`EngineState`] transitions to subscribers.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use super::state_bus::StateBus;

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// User input.
    User,
    /// Model output.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Constrains the model output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    /// `json_object`.
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON schema, serialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl ResponseFormat {
    /// JSON output conforming to `schema`.
    #[must_use]
    pub fn json_object(schema: &serde_json::Value) -> Self {
        Self {
            kind: "json_object".to_string(),
            schema: Some(schema.to_string()),
        }
    }
}

/// Streaming chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Completion length limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output format constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Errors raised by engines and backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The backend cannot run in this environment.
    #[error("inference backend not supported in this environment")]
    Unsupported,

    /// Loading the model failed.
    #[error("failed to load model: {0}")]
    Load(String),

    /// The completion request failed.
    #[error("completion request failed: {0}")]
    Request(String),

    /// The response stream broke off.
    #[error("completion stream failed: {0}")]
    Stream(String),
}

/// Stream of text deltas.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// A loaded model.
#[async_trait]
pub trait InferenceEngine: Send + Sync + std::fmt::Debug {
    /// Starts a streaming completion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Request`] if the completion cannot start.
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, EngineError>;
}

/// Loads engines.
#[async_trait]
pub trait EngineBackend: Send + Sync + std::fmt::Debug {
    /// Whether this backend can run here at all.
    fn is_supported(&self) -> bool;

    /// Loads the model, reporting progress in `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the model cannot be loaded.
    async fn load(
        &self,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Arc<dyn InferenceEngine>, EngineError>;
}

/// Lifecycle phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Nothing loaded.
    #[default]
    Idle,
    /// Load in progress.
    Loading,
    /// Engine available.
    Ready,
    /// Last load failed.
    Failed,
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EngineState {
    /// Lifecycle phase.
    pub status: EngineStatus,
    /// Load progress in `0.0..=1.0`.
    pub progress: f32,
    /// Message of the last load failure.
    pub error: Option<String>,
}

/// Transitions buffered per subscriber. One load publishes a handful of
/// status changes plus one update per progress report.
pub const STATE_CHANNEL_CAPACITY: usize = 256;

/// Owns one engine and its lifecycle.
#[derive(Debug)]
pub struct EngineService {
    backend: Arc<dyn EngineBackend>,
    engine: Mutex<Option<Arc<dyn InferenceEngine>>>,
    state: StateBus<EngineState>,
}

impl EngineService {
    /// Creates a service; nothing is loaded until
    /// [`EngineService::initialize`].
    #[must_use]
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        Self {
            backend,
            engine: Mutex::new(None),
            state: StateBus::new(EngineState::default(), STATE_CHANNEL_CAPACITY),
        }
    }

    /// Whether the backend can run here.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    /// Whether an engine is loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.current().status == EngineStatus::Ready
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state.current()
    }

    /// Current state plus every later transition, in order.
    ///
    /// A subscriber that leaves more than [`STATE_CHANNEL_CAPACITY`]
    /// transitions unread gets `RecvError::Lagged` and resumes with the
    /// oldest transition still buffered; [`EngineService::state`] is always
    /// current.
    #[must_use]
    pub fn subscribe(&self) -> (EngineState, broadcast::Receiver<EngineState>) {
        self.state.subscribe()
    }

    /// Returns the engine, loading it first if needed.
    ///
    /// Concurrent callers wait for the same load. A failed load is not
    /// remembered: the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unsupported`] without doing any work when the
    /// backend cannot run here, or the load error.
    pub async fn initialize(&self) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        if !self.backend.is_supported() {
            return Err(EngineError::Unsupported);
        }

        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        self.state.update(|s| {
            s.status = EngineStatus::Loading;
            s.progress = 0.0;
            s.error = None;
        });
        tracing::info!("loading inference engine");

        let bus = self.state.clone();
        let report = move |progress: f32| {
            bus.update(|s| s.progress = progress.clamp(0.0, 1.0));
        };

        match self.backend.load(&report).await {
            Ok(engine) => {
                *slot = Some(Arc::clone(&engine));
                self.state.update(|s| {
                    s.status = EngineStatus::Ready;
                    s.progress = 1.0;
                });
                tracing::info!("inference engine ready");
                Ok(engine)
            }
            Err(e) => {
                self.state.update(|s| {
                    s.status = EngineStatus::Failed;
                    s.error = Some(e.to_string());
                });
                tracing::warn!(error = %e, "inference engine failed to load");
                Err(e)
            }
        }
    }

    /// Drops the loaded engine.
    pub async fn shutdown(&self) {
        let previous = self.engine.lock().await.take();
        if previous.is_some() {
            self.state.update(|s| *s = EngineState::default());
            tracing::info!("inference engine unloaded");
        }
    }
}
