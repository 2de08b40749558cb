//! REST API layer: route handlers, DTOs, cookies and router composition.
//!
//! Patreon endpoints are mounted under `/api/patreon`; the health check
//! answers on both `/api/health` and `/health`.

pub mod cookies;
pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every HTTP endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "patreon-gateway",
        description = "Patreon webhook receiver, OAuth sign-in and subscriber sync for the portfolio site"
    ),
    paths(
        handlers::webhook::patreon_webhook,
        handlers::oauth::authorize,
        handlers::oauth::callback,
        handlers::oauth::logout,
        handlers::system::health_handler,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        dto::SubscriberDto,
        dto::WebhookProcessedResponse,
        dto::WebhookIgnoredResponse,
        dto::HealthResponse,
        dto::HealthChecks,
        dto::HealthCheck,
        dto::CheckStatus,
        dto::HealthStatus,
    )),
    tags(
        (name = "Patreon", description = "Pledge webhooks and OAuth sign-in"),
        (name = "System", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes())
}
