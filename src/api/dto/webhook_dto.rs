//! Webhook response bodies.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Subscriber;

/// Subscriber fields echoed back after a pledge event.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDto {
    /// Normalized email.
    pub email: String,
    /// Active flag after the write.
    pub is_active: bool,
}

impl From<&Subscriber> for SubscriberDto {
    fn from(subscriber: &Subscriber) -> Self {
        Self {
            email: subscriber.email.clone(),
            is_active: subscriber.is_active,
        }
    }
}

/// `200` body for a processed pledge event.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookProcessedResponse {
    /// Always `true`.
    pub success: bool,
    /// `Successfully processed pledge:create` or `…pledge:delete`.
    pub message: String,
    /// Record after the write.
    pub subscriber: SubscriberDto,
}

/// `200` body for an authentic delivery of an unsupported event.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookIgnoredResponse {
    /// Always `Event type not supported`.
    pub message: String,
    /// The `X-Patreon-Event` header, or `null`.
    pub event_type: Option<String>,
}
