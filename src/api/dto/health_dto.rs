//! Health check response bodies.

use serde::Serialize;
use utoipa::ToSchema;

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Check succeeded.
    Pass,
    /// Check failed.
    Fail,
}

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every check passed.
    Healthy,
    /// At least one check failed.
    Unhealthy,
}

/// Result of a single dependency check.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    /// Pass or fail.
    pub status: CheckStatus,
    /// Human-readable summary.
    pub message: String,
    /// Extra diagnostic fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HealthCheck {
    /// Passing check.
    #[must_use]
    pub fn pass(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Failing check.
    #[must_use]
    pub fn fail(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
            details,
        }
    }
}

/// Checks reported by the health endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Configuration validation.
    pub environment: HealthCheck,
    /// Subscriber database reachability. The key name is kept for
    /// existing monitors.
    pub supabase: HealthCheck,
}

/// `GET /api/health` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Healthy only when every check passed.
    pub status: HealthStatus,
    /// RFC 3339 time of the check.
    pub timestamp: String,
    /// Individual results.
    pub checks: HealthChecks,
}
