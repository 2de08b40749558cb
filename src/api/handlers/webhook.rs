//! Patreon pledge webhook handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{SubscriberDto, WebhookIgnoredResponse, WebhookProcessedResponse};
use crate::app_state::AppState;
use crate::domain::pledge_event::EVENT_HEADER;
use crate::error::{ApiError, ErrorResponse};
use crate::patreon::SIGNATURE_HEADER;
use crate::service::{WebhookDelivery, WebhookOutcome};

/// `POST /api/patreon/webhook`: Apply a signed pledge event.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what Patreon signed, before any decoding.
///
/// # Errors
///
/// Returns [`ApiError`] for bad signatures (401), unusable payloads (400)
/// and store failures (500).
#[utoipa::path(
    post,
    path = "/api/patreon/webhook",
    tag = "Patreon",
    summary = "Receive a pledge webhook",
    description = "Verifies the HMAC-MD5 signature in `X-Patreon-Signature`, then activates or deactivates the subscriber named in the payload according to `X-Patreon-Event`.",
    request_body(content = String, content_type = "application/json"),
    params(
        ("X-Patreon-Signature" = String, Header, description = "Hex HMAC-MD5 of the raw body"),
        ("X-Patreon-Event" = Option<String>, Header, description = "members:pledge:create or members:pledge:delete"),
    ),
    responses(
        (status = 200, description = "Pledge event applied; unsupported event types get a `WebhookIgnoredResponse`", body = WebhookProcessedResponse),
        (status = 400, description = "Invalid JSON or missing email", body = ErrorResponse),
        (status = 401, description = "Invalid webhook signature", body = ErrorResponse),
        (status = 500, description = "Subscriber could not be updated", body = ErrorResponse),
    )
)]
pub async fn patreon_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let delivery = WebhookDelivery {
        body: &body,
        signature: header_str(&headers, SIGNATURE_HEADER),
        event_type: header_str(&headers, EVENT_HEADER),
    };

    let response = match state.webhook_service.handle(delivery).await? {
        WebhookOutcome::Processed { action, subscriber } => Json(WebhookProcessedResponse {
            success: true,
            message: format!("Successfully processed {}", action.event_name()),
            subscriber: SubscriberDto::from(&subscriber),
        })
        .into_response(),
        WebhookOutcome::Ignored { event_type } => Json(WebhookIgnoredResponse {
            message: "Event type not supported".to_string(),
            event_type,
        })
        .into_response(),
    };
    Ok(response)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/patreon/webhook", post(patreon_webhook))
}
