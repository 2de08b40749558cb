//! Cookie helpers for the OAuth endpoints.

use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::service::SessionSummary;

/// Signed `{token, redirect}` bundle set during authorization.
pub const STATE_COOKIE_NAME: &str = "patreon_oauth_state";

/// Client-readable session summary.
pub const SESSION_COOKIE_NAME: &str = "patreon_session";

/// State cookie lifetime: 10 minutes.
pub const STATE_COOKIE_MAX_AGE_SECS: u64 = 600;

/// Session cookie lifetime: 7 days.
pub const SESSION_COOKIE_MAX_AGE_SECS: u64 = 604_800;

/// `Set-Cookie` value for the OAuth state cookie.
#[must_use]
pub fn state_cookie(value: &str) -> String {
    format!(
        "{STATE_COOKIE_NAME}={value}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={STATE_COOKIE_MAX_AGE_SECS}"
    )
}

/// `Set-Cookie` value for the session cookie. Not `HttpOnly`: the site's
/// scripts read it to render the signed-in state.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the session cannot be serialized.
pub fn session_cookie(session: &SessionSummary) -> Result<String, ApiError> {
    let json = serde_json::to_string(session).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; Secure; SameSite=Lax; Max-Age={SESSION_COOKIE_MAX_AGE_SECS}",
        urlencoding::encode(&json)
    ))
}

/// Expires the state cookie.
#[must_use]
pub fn clear_state_cookie() -> String {
    format!("{STATE_COOKIE_NAME}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0")
}

/// Expires the session cookie.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; Secure; SameSite=Lax; Max-Age=0")
}

/// Reads a cookie from the request `Cookie` header.
#[must_use]
pub fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `302 Found` to `location`, appending each `Set-Cookie` value.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if a header value is not valid.
pub fn found(location: &str, cookies: &[String]) -> Result<Response, ApiError> {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(LOCATION, header_value(location)?);
    for cookie in cookies {
        headers.append(SET_COOKIE, header_value(cookie)?);
    }
    Ok(response)
}

fn header_value(raw: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(raw).map_err(|e| ApiError::Internal(format!("invalid header value: {e}")))
}
