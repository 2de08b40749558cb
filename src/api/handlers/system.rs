//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{CheckStatus, HealthCheck, HealthChecks, HealthResponse, HealthStatus};
use crate::app_state::AppState;
use crate::config::ConfigError;

/// `GET /api/health`: Configuration and database health.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    summary = "Health check",
    description = "Validates the configuration and counts subscribers to prove the database is reachable. Also served at `/health`.",
    responses(
        (status = 200, description = "All checks passed", body = HealthResponse),
        (status = 503, description = "At least one check failed", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let environment = check_environment(&state);
    let supabase = check_database(&state).await;

    let healthy = environment.status == CheckStatus::Pass && supabase.status == CheckStatus::Pass;
    let (code, status) = if healthy {
        (StatusCode::OK, HealthStatus::Healthy)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
    };

    (
        code,
        Json(HealthResponse {
            status,
            timestamp: Utc::now().to_rfc3339(),
            checks: HealthChecks {
                environment,
                supabase,
            },
        }),
    )
}

fn check_environment(state: &AppState) -> HealthCheck {
    match state.config.validate() {
        Ok(()) => HealthCheck::pass(
            "All required environment variables are configured",
            serde_json::json!({ "variablesConfigured": state.config.required_variables() }),
        ),
        Err(ConfigError::Invalid(problems)) => HealthCheck::fail(
            "One or more required environment variables are missing or invalid",
            Some(serde_json::json!({ "problems": problems })),
        ),
        Err(other) => HealthCheck::fail(other.to_string(), None),
    }
}

async fn check_database(state: &AppState) -> HealthCheck {
    match state.store.count().await {
        Ok(count) => HealthCheck::pass(
            "Database connection healthy",
            serde_json::json!({
                "database": "connected",
                "subscribersTable": "accessible",
                "recordCount": count,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e.message, code = ?e.code, "health check database probe failed");
            HealthCheck::fail(
                format!("Database connection failed: {}", e.message),
                Some(serde_json::json!({ "errorCode": e.code })),
            )
        }
    }
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/health", get(health_handler))
}
