//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::patreon::PatreonApi;
use crate::persistence::SubscriberStore;
use crate::service::{OAuthService, StateCookieCodec, WebhookService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GatewayConfig>,
    /// Subscriber store, also probed by the health check.
    pub store: Arc<dyn SubscriberStore>,
    /// Pledge webhook processing.
    pub webhook_service: Arc<WebhookService>,
    /// Patreon sign-in flow.
    pub oauth_service: Arc<OAuthService>,
}

impl AppState {
    /// Wires the services around an already-connected store and Patreon
    /// client.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn SubscriberStore>,
        patreon: Arc<dyn PatreonApi>,
    ) -> Self {
        let webhook_service = Arc::new(WebhookService::new(
            Arc::clone(&store),
            config.patreon.webhook_secret.clone(),
        ));
        let oauth_service = Arc::new(OAuthService::new(
            patreon,
            Arc::clone(&store),
            StateCookieCodec::new(&config.oauth_state_secret),
            config.callback_url(),
        ));
        Self {
            config: Arc::new(config),
            store,
            webhook_service,
            oauth_service,
        }
    }
}
