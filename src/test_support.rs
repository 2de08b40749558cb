//! Fakes and builders shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::app_state::AppState;
use crate::config::{GatewayConfig, PatreonConfig};
use crate::cta::engine::{ChatRequest, EngineBackend, EngineError, InferenceEngine, TextStream};
use crate::domain::Subscriber;
use crate::error::StoreError;
use crate::patreon::types::{
    IncludedResource, MembershipAttributes, MembershipData, UserAttributes, UserData,
};
use crate::patreon::{IdentityResponse, PatreonApi, PatreonApiError, PatronStatus, TokenResponse};
use crate::persistence::{MemorySubscriberStore, SubscriberStore};

/// Webhook secret configured in test services.
pub const TEST_WEBHOOK_SECRET: &str = "whsec-test-0123456789";

/// Callback URL configured in test services.
pub const TEST_CALLBACK_URL: &str = "https://portfolio.test/api/patreon/callback";

/// In-memory store that records every upsert as it was requested.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemorySubscriberStore,
    upserts: Mutex<Vec<(String, bool)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw `(email, is_active)` arguments in call order.
    pub fn upserts(&self) -> Vec<(String, bool)> {
        self.upserts.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts().len()
    }
}

#[async_trait]
impl SubscriberStore for RecordingStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        self.inner.get_by_email(email).await
    }

    async fn upsert(&self, email: &str, is_active: bool) -> Result<Subscriber, StoreError> {
        if let Ok(mut calls) = self.upserts.lock() {
            calls.push((email.to_string(), is_active));
        }
        self.inner.upsert(email, is_active).await
    }

    async fn set_active_status(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<Option<Subscriber>, StoreError> {
        self.inner.set_active_status(email, is_active).await
    }

    async fn delete(&self, email: &str) -> Result<bool, StoreError> {
        self.inner.delete(email).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }
}

/// Store whose every operation fails like a dropped database connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl FailingStore {
    fn error(operation: &str) -> StoreError {
        StoreError {
            message: format!("Failed to {operation}: connection reset by peer"),
            code: Some("08006".to_string()),
            details: Some(serde_json::json!({ "table": "subscribers" })),
            transient: true,
        }
    }
}

#[async_trait]
impl SubscriberStore for FailingStore {
    async fn get_by_email(&self, _email: &str) -> Result<Option<Subscriber>, StoreError> {
        Err(Self::error("get subscriber"))
    }

    async fn upsert(&self, _email: &str, _is_active: bool) -> Result<Subscriber, StoreError> {
        Err(Self::error("upsert subscriber"))
    }

    async fn set_active_status(
        &self,
        _email: &str,
        _is_active: bool,
    ) -> Result<Option<Subscriber>, StoreError> {
        Err(Self::error("update subscriber status"))
    }

    async fn delete(&self, _email: &str) -> Result<bool, StoreError> {
        Err(Self::error("delete subscriber"))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Err(Self::error("count subscribers"))
    }
}

/// Scripted Patreon API.
#[derive(Debug)]
pub struct FakePatreon {
    identity: Option<IdentityResponse>,
    exchanged: Mutex<Vec<String>>,
}

impl FakePatreon {
    /// A user with `email` whose single membership is active or former.
    pub fn patron(email: &str, active: bool) -> Self {
        let status = if active {
            PatronStatus::ActivePatron
        } else {
            PatronStatus::FormerPatron
        };
        let identity = IdentityResponse {
            data: UserData {
                id: "user-1".to_string(),
                attributes: UserAttributes {
                    email: Some(email.to_string()),
                    full_name: Some("Test Patron".to_string()),
                    image_url: Some("https://c8.patreon.test/avatar.png".to_string()),
                    is_email_verified: Some(true),
                    ..UserAttributes::default()
                },
            },
            included: vec![IncludedResource::Member(MembershipData {
                id: "member-1".to_string(),
                attributes: MembershipAttributes {
                    patron_status: Some(status),
                    currently_entitled_amount_cents: Some(500),
                    ..MembershipAttributes::default()
                },
            })],
        };
        Self {
            identity: Some(identity),
            exchanged: Mutex::new(Vec::new()),
        }
    }

    /// Every token exchange is rejected upstream.
    pub fn failing() -> Self {
        Self {
            identity: None,
            exchanged: Mutex::new(Vec::new()),
        }
    }

    /// Codes passed to `exchange_code`, in call order.
    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged.lock().map(|codes| codes.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PatreonApi for FakePatreon {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, PatreonApiError> {
        let url = url::Url::parse_with_params(
            "https://www.patreon.com/oauth2/authorize",
            &[
                ("response_type", "code"),
                ("client_id", "test-client"),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResponse, PatreonApiError> {
        if let Ok(mut codes) = self.exchanged.lock() {
            codes.push(code.to_string());
        }
        if self.identity.is_none() {
            return Err(PatreonApiError::Status {
                endpoint: "token exchange",
                status: 401,
            });
        }
        Ok(TokenResponse {
            access_token: format!("token-for-{code}"),
            expires_in: Some(2_678_400),
            scope: None,
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn fetch_identity(
        &self,
        _access_token: &str,
    ) -> Result<IdentityResponse, PatreonApiError> {
        self.identity.clone().ok_or(PatreonApiError::Status {
            endpoint: "identity",
            status: 401,
        })
    }
}

/// Configuration that passes validation.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        public_base_url: "https://portfolio.test".to_string(),
        persistence_enabled: false,
        patreon: PatreonConfig {
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            client_id: "client-id-0123456789abcdef".to_string(),
            client_secret: "client-secret-0123456789abcdef".to_string(),
        },
        oauth_state_secret: "state-secret-0123456789abcdef".to_string(),
        ..GatewayConfig::default()
    }
}

/// Application state wired to the given store and Patreon fake.
pub fn test_state(store: Arc<dyn SubscriberStore>, patreon: Arc<dyn PatreonApi>) -> AppState {
    AppState::new(test_config(), store, patreon)
}

/// Backend whose engine replays fixed deltas.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    chunks: Vec<Result<String, EngineError>>,
    supported: bool,
    fail_first_load: bool,
    loads: AtomicUsize,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedBackend {
    /// Every completion streams `chunks` in order.
    pub fn new(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(|c| Ok(c.to_string())).collect(),
            supported: true,
            ..Self::default()
        }
    }

    /// Streams `chunks`, then breaks off with a stream error.
    pub fn broken_stream(chunks: Vec<&str>) -> Self {
        let mut backend = Self::new(chunks);
        backend
            .chunks
            .push(Err(EngineError::Stream("connection closed".to_string())));
        backend
    }

    /// Reports itself unsupported.
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// The first load fails, later loads succeed.
    pub fn failing_once(chunks: Vec<&str>) -> Self {
        Self {
            fail_first_load: true,
            ..Self::new(chunks)
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Requests received by loaded engines, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EngineBackend for ScriptedBackend {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn load(
        &self,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        let previous = self.loads.fetch_add(1, Ordering::SeqCst);
        progress(0.5);
        tokio::task::yield_now().await;
        if self.fail_first_load && previous == 0 {
            return Err(EngineError::Load("weights unavailable".to_string()));
        }
        progress(1.0);
        Ok(Arc::new(ScriptedEngine {
            chunks: self.chunks.clone(),
            requests: Arc::clone(&self.requests),
        }))
    }
}

#[derive(Debug)]
struct ScriptedEngine {
    chunks: Vec<Result<String, EngineError>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, EngineError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(Box::pin(futures_util::stream::iter(self.chunks.clone())))
    }
}
