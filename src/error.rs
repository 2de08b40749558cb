//! Gateway error types with HTTP status code mapping.
//!
//! [`ApiError`] is the error type returned by HTTP-facing services. Each
//! variant maps to a specific HTTP status code and a structured JSON error
//! response. [`StoreError`] is the subscriber store failure carried inside
//! [`ApiError::Store`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1201,
///     "message": "Unauthorized: Invalid webhook signature"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`ApiError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure reported by a subscriber store backend.
///
/// Carries the provider's machine-readable error code (a PostgreSQL
/// SQLSTATE for the Postgres store) and opaque details so callers can tell
/// transient failures from permanent ones without parsing messages.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    /// Human-readable description including the failed operation.
    pub message: String,
    /// Provider error code, when the backend reported one.
    pub code: Option<String>,
    /// Opaque provider details (constraint, table, ...).
    pub details: Option<serde_json::Value>,
    /// Whether retrying the same operation may succeed.
    pub transient: bool,
}

impl StoreError {
    /// Creates a permanent store error without provider code or details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            transient: false,
        }
    }

    /// Wraps a `sqlx` failure, keeping the SQLSTATE and constraint info.
    #[must_use]
    pub fn from_sqlx(operation: &str, err: &sqlx::Error) -> Self {
        let message = format!("Failed to {operation}: {err}");
        match err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                let transient = code.as_deref().is_some_and(is_transient_sqlstate);
                let details = serde_json::json!({
                    "constraint": db.constraint(),
                    "table": db.table(),
                });
                Self {
                    message,
                    code,
                    details: Some(details),
                    transient,
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Self {
                message,
                code: None,
                details: None,
                transient: true,
            },
            _ => Self::new(message),
        }
    }
}

/// SQLSTATE classes that indicate a retryable condition: connection
/// exceptions (08), transaction rollbacks (40), insufficient resources (53)
/// and operator intervention such as admin shutdown (57P).
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("40") || code.starts_with("53") || code.starts_with("57P")
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status               |
/// |-----------|-----------------------|---------------------------|
/// | 1000–1099 | Malformed input       | 400 Bad Request           |
/// | 1100–1199 | OAuth state / CSRF    | 400 Bad Request           |
/// | 1200–1299 | Authentication        | 401 Unauthorized          |
/// | 3000–3999 | Server                | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body or parameters could not be used.
    #[error("{0}")]
    BadRequest(String),

    /// OAuth state cookie missing, unreadable or not matching the callback.
    #[error("{0}")]
    InvalidState(String),

    /// Request authenticity could not be established.
    #[error("{0}")]
    Unauthorized(String),

    /// Subscriber store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::BadRequest(_) => 1001,
            Self::InvalidState(_) => 1101,
            Self::Unauthorized(_) => 1201,
            Self::Store(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client. Server-side failures never
    /// expose their internal detail.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) => "Internal Server Error: Failed to update subscriber".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.public_message(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
