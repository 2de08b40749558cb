//! Patreon OAuth handlers: authorize, callback, logout.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::api::cookies::{
    STATE_COOKIE_NAME, clear_session_cookie, clear_state_cookie, extract_cookie_value, found,
    session_cookie, state_cookie,
};
use crate::api::dto::{AuthorizeParams, CallbackParams};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};
use crate::service::{CallbackOutcome, CallbackRequest};

/// `GET /api/patreon/auth`: Start Patreon sign-in.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the redirect cannot be built.
#[utoipa::path(
    get,
    path = "/api/patreon/auth",
    tag = "Patreon",
    summary = "Start Patreon sign-in",
    description = "Sets the signed `patreon_oauth_state` cookie and redirects to the Patreon consent page.",
    params(AuthorizeParams),
    responses(
        (status = 302, description = "Redirect to Patreon"),
        (status = 500, description = "Redirect could not be built", body = ErrorResponse),
    )
)]
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, ApiError> {
    let start = state.oauth_service.authorize(params.redirect.as_deref())?;
    found(&start.authorization_url, &[state_cookie(&start.state_cookie)])
}

/// `GET /api/patreon/callback`: Finish Patreon sign-in.
///
/// # Errors
///
/// Returns [`ApiError`] (400) when parameters are missing or the state
/// does not verify.
#[utoipa::path(
    get,
    path = "/api/patreon/callback",
    tag = "Patreon",
    summary = "Finish Patreon sign-in",
    description = "Validates the state against the `patreon_oauth_state` cookie, exchanges the code, records the subscriber, sets `patreon_session` and redirects to the stored path.",
    params(CallbackParams),
    responses(
        (status = 302, description = "Redirect to the stored path, or to /?error=access_denied or /?error=auth_failed"),
        (status = 400, description = "Missing parameters or invalid state", body = ErrorResponse),
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let state_cookie_value = extract_cookie_value(&headers, STATE_COOKIE_NAME);
    let outcome = state
        .oauth_service
        .callback(CallbackRequest {
            code: params.code.as_deref(),
            state: params.state.as_deref(),
            error: params.error.as_deref(),
            state_cookie: state_cookie_value.as_deref(),
        })
        .await?;

    let cookies = match &outcome {
        CallbackOutcome::Denied { .. } => Vec::new(),
        CallbackOutcome::SignedIn { session, .. } => {
            vec![clear_state_cookie(), session_cookie(session)?]
        }
        CallbackOutcome::Failed => vec![clear_state_cookie()],
    };
    found(outcome.location(), &cookies)
}

/// `GET|POST /api/patreon/logout`: Drop the session cookie.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] only if the redirect cannot be built.
#[utoipa::path(
    get,
    path = "/api/patreon/logout",
    tag = "Patreon",
    summary = "Sign out",
    description = "Clears `patreon_session` and redirects home. Also accepts POST.",
    responses(
        (status = 302, description = "Redirect to /"),
    )
)]
pub async fn logout() -> Result<Response, ApiError> {
    found("/", &[clear_session_cookie()])
}

/// OAuth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patreon/auth", get(authorize))
        .route("/patreon/callback", get(callback))
        .route("/patreon/logout", get(logout).post(logout))
}
