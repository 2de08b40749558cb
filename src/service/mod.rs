//! Service layer: business logic orchestration.
//!
//! [`WebhookService`] turns signed pledge deliveries into subscriber
//! writes. [`OAuthService`] runs the Patreon sign-in flow and records the
//! signed-in user. Both return explicit outcome values that the HTTP
//! handlers translate into responses.

pub mod oauth_service;
pub mod oauth_state;
pub mod webhook_service;

pub use oauth_service::{
    AuthorizeRedirect, CallbackOutcome, CallbackRequest, OAuthService, SessionSummary,
};
pub use oauth_state::{OAuthState, StateCookieCodec};
pub use webhook_service::{WebhookDelivery, WebhookOutcome, WebhookService};
