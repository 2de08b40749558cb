//! Webhook service: verifies, classifies and applies pledge deliveries.

use std::sync::Arc;

use crate::domain::{PledgeAction, Subscriber, WebhookPayload};
use crate::error::ApiError;
use crate::patreon::verify_signature;
use crate::persistence::SubscriberStore;

/// One inbound webhook request, as received.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    /// Raw request body, exactly as signed.
    pub body: &'a [u8],
    /// `X-Patreon-Signature` header.
    pub signature: Option<&'a str>,
    /// `X-Patreon-Event` header.
    pub event_type: Option<&'a str>,
}

/// Result of a delivery that was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The subscriber record was written.
    Processed {
        /// What the event did.
        action: PledgeAction,
        /// Record after the write.
        subscriber: Subscriber,
    },
    /// Authentic delivery of an event type this gateway does not act on.
    Ignored {
        /// The event type header, if any.
        event_type: Option<String>,
    },
}

/// Orchestrates webhook processing.
///
/// Every delivery walks the same steps and stops at the first failure:
/// verify → parse → extract email → classify → upsert.
#[derive(Debug, Clone)]
pub struct WebhookService {
    store: Arc<dyn SubscriberStore>,
    secret: Option<String>,
}

impl WebhookService {
    /// Creates a new `WebhookService`.
    #[must_use]
    pub fn new(store: Arc<dyn SubscriberStore>, secret: Option<String>) -> Self {
        Self { store, secret }
    }

    /// Processes one delivery.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] when the signature does not verify.
    /// - [`ApiError::BadRequest`] for unparsable JSON or a missing email.
    /// - [`ApiError::Store`] when the subscriber could not be written.
    pub async fn handle(&self, delivery: WebhookDelivery<'_>) -> Result<WebhookOutcome, ApiError> {
        if let Err(reason) =
            verify_signature(delivery.body, delivery.signature, self.secret.as_deref())
        {
            tracing::error!(%reason, "webhook signature verification failed");
            return Err(ApiError::Unauthorized(
                "Unauthorized: Invalid webhook signature".to_string(),
            ));
        }

        let payload: WebhookPayload = serde_json::from_slice(delivery.body).map_err(|e| {
            tracing::error!(error = %e, "failed to parse webhook payload");
            ApiError::BadRequest("Bad Request: Invalid JSON payload".to_string())
        })?;

        let Some(email) = payload.email() else {
            tracing::error!(
                member_id = ?payload.member_id(),
                kind = ?payload.member_kind(),
                "webhook payload has no email"
            );
            return Err(ApiError::BadRequest(
                "Bad Request: Email not found in payload".to_string(),
            ));
        };

        let Some(action) = PledgeAction::from_event_type(delivery.event_type) else {
            tracing::info!(event_type = ?delivery.event_type, email, "unsupported webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: delivery.event_type.map(str::to_string),
            });
        };

        tracing::info!(event = action.event_name(), email, "processing pledge event");

        let subscriber = self
            .store
            .upsert(email, action.is_active())
            .await
            .map_err(|e| {
                tracing::error!(
                    event = action.event_name(),
                    email,
                    error = %e.message,
                    code = ?e.code,
                    details = ?e.details,
                    transient = e.transient,
                    "failed to update subscriber"
                );
                ApiError::Store(e)
            })?;

        tracing::info!(
            event = action.event_name(),
            email = %subscriber.email,
            is_active = subscriber.is_active,
            subscriber_id = %subscriber.id,
            "webhook processed"
        );

        Ok(WebhookOutcome::Processed { action, subscriber })
    }
}
