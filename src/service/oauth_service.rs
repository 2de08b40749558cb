//! Patreon OAuth sign-in flow.
//!
//! [`OAuthService::authorize`] issues the state cookie and consent URL.
//! [`OAuthService::callback`] validates the returned state against the
//! cookie before any upstream call, then exchanges the code, reads the
//! identity, records the subscriber and returns the session to set.

use std::sync::Arc;

use serde::Serialize;

use super::oauth_state::{OAuthState, StateCookieCodec};
use crate::error::{ApiError, StoreError};
use crate::patreon::{PatreonApi, PatreonApiError, PatronStatus, PatreonUserInfo};
use crate::persistence::SubscriberStore;

/// Redirect target when the user declined consent.
pub const DENIED_REDIRECT: &str = "/?error=access_denied";

/// Redirect target when sign-in failed after state validation.
pub const FAILURE_REDIRECT: &str = "/?error=auth_failed";

/// Everything the handler needs to start authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRedirect {
    /// Patreon consent URL.
    pub authorization_url: String,
    /// Signed value for the state cookie.
    pub state_cookie: String,
}

/// Query parameters and cookie of a callback request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackRequest<'a> {
    /// Authorization code.
    pub code: Option<&'a str>,
    /// State echoed back by Patreon.
    pub state: Option<&'a str>,
    /// Error reported by Patreon (e.g. `access_denied`).
    pub error: Option<&'a str>,
    /// Raw `patreon_oauth_state` cookie value.
    pub state_cookie: Option<&'a str>,
}

/// Client-visible session stored in the `patreon_session` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Email address from Patreon.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Avatar URL.
    pub image_url: Option<String>,
    /// Whether the user holds an active pledge.
    pub is_patron: bool,
    /// Status of the selected membership.
    pub patron_status: Option<PatronStatus>,
}

impl From<&PatreonUserInfo> for SessionSummary {
    fn from(info: &PatreonUserInfo) -> Self {
        Self {
            email: info.email.clone(),
            full_name: info.full_name.clone(),
            image_url: info.image_url.clone(),
            is_patron: info.is_patron,
            patron_status: info.patron_status.clone(),
        }
    }
}

/// Result of a callback that passed (or skipped) state validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The user declined on Patreon.
    Denied {
        /// Error string reported by Patreon.
        reason: String,
    },
    /// Sign-in completed.
    SignedIn {
        /// Session to store client-side.
        session: SessionSummary,
        /// Same-site path to continue to.
        redirect_to: String,
    },
    /// Token exchange, identity fetch or subscriber write failed.
    Failed,
}

impl CallbackOutcome {
    /// Location the user agent is sent to.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Denied { .. } => DENIED_REDIRECT,
            Self::SignedIn { redirect_to, .. } => redirect_to,
            Self::Failed => FAILURE_REDIRECT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SignInError {
    #[error(transparent)]
    Patreon(#[from] PatreonApiError),
    #[error("identity response has no email")]
    MissingEmail,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives the authorize and callback steps.
#[derive(Debug, Clone)]
pub struct OAuthService {
    patreon: Arc<dyn PatreonApi>,
    store: Arc<dyn SubscriberStore>,
    codec: StateCookieCodec,
    callback_url: String,
}

impl OAuthService {
    /// Creates a new `OAuthService`.
    #[must_use]
    pub fn new(
        patreon: Arc<dyn PatreonApi>,
        store: Arc<dyn SubscriberStore>,
        codec: StateCookieCodec,
        callback_url: String,
    ) -> Self {
        Self {
            patreon,
            store,
            codec,
            callback_url,
        }
    }

    /// Issues a state token and builds the consent redirect.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the URL or the cookie cannot be
    /// built.
    pub fn authorize(&self, redirect: Option<&str>) -> Result<AuthorizeRedirect, ApiError> {
        let state = OAuthState::issue(redirect);
        let state_cookie = self.codec.encode(&state).map_err(|e| {
            tracing::error!(error = %e, "failed to sign oauth state");
            ApiError::Internal(e.to_string())
        })?;
        let authorization_url = self
            .patreon
            .authorization_url(&self.callback_url, &state.token)
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build authorization url");
                ApiError::Internal(e.to_string())
            })?;

        tracing::info!(redirect = %state.redirect, "starting patreon authorization");
        Ok(AuthorizeRedirect {
            authorization_url,
            state_cookie,
        })
    }

    /// Completes the OAuth callback.
    ///
    /// # Errors
    ///
    /// - [`ApiError::BadRequest`] when `code` or `state` is missing.
    /// - [`ApiError::InvalidState`] when the state cookie is missing,
    ///   unreadable or does not match.
    ///
    /// Upstream and store failures are not errors: they yield
    /// [`CallbackOutcome::Failed`].
    pub async fn callback(&self, request: CallbackRequest<'_>) -> Result<CallbackOutcome, ApiError> {
        if let Some(reason) = request.error {
            tracing::warn!(reason, "patreon authorization denied");
            return Ok(CallbackOutcome::Denied {
                reason: reason.to_string(),
            });
        }

        let (Some(code), Some(state)) = (
            request.code.filter(|c| !c.is_empty()),
            request.state.filter(|s| !s.is_empty()),
        ) else {
            return Err(ApiError::BadRequest(
                "Missing required parameters".to_string(),
            ));
        };

        let Some(raw_cookie) = request.state_cookie.filter(|c| !c.is_empty()) else {
            tracing::warn!("oauth callback without state cookie");
            return Err(ApiError::InvalidState(
                "Invalid state - session expired".to_string(),
            ));
        };

        let stored = self.codec.decode(raw_cookie).map_err(|e| {
            tracing::warn!(error = %e, "unreadable oauth state cookie");
            ApiError::InvalidState("Invalid state format".to_string())
        })?;

        if stored.token != state {
            tracing::warn!("oauth state mismatch");
            return Err(ApiError::InvalidState(
                "State verification failed".to_string(),
            ));
        }

        match self.sign_in(code).await {
            Ok(session) => {
                tracing::info!(
                    email = %session.email,
                    is_patron = session.is_patron,
                    "patreon sign-in completed"
                );
                Ok(CallbackOutcome::SignedIn {
                    session,
                    redirect_to: stored.redirect,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "patreon sign-in failed");
                Ok(CallbackOutcome::Failed)
            }
        }
    }

    async fn sign_in(&self, code: &str) -> Result<SessionSummary, SignInError> {
        let tokens = self.patreon.exchange_code(code, &self.callback_url).await?;
        let identity = self.patreon.fetch_identity(&tokens.access_token).await?;
        let info = identity.into_user_info().ok_or(SignInError::MissingEmail)?;

        self.store.upsert(&info.email, info.is_patron).await?;
        Ok(SessionSummary::from(&info))
    }
}
