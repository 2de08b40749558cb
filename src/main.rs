//! patreon-gateway server entry point.
//!
//! Starts the Axum HTTP server with the Patreon webhook, OAuth and health
//! endpoints.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use patreon_gateway::api;
use patreon_gateway::app_state::AppState;
use patreon_gateway::config::{GatewayConfig, LogFormat};
use patreon_gateway::error::ApiError;
use patreon_gateway::patreon::HttpPatreonClient;
use patreon_gateway::persistence::{
    MemorySubscriberStore, PostgresSubscriberStore, SubscriberStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(addr = %config.listen_addr, "starting patreon-gateway");
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "configuration incomplete; affected endpoints will fail");
    }

    // Build persistence layer
    let postgres = if config.persistence_enabled {
        let store = PostgresSubscriberStore::connect(&config).await?;
        store.migrate().await?;
        tracing::info!("connected to PostgreSQL, migrations applied");
        Some(Arc::new(store))
    } else {
        tracing::warn!("persistence disabled, subscribers are kept in memory");
        None
    };
    let store: Arc<dyn SubscriberStore> = match &postgres {
        Some(pg) => Arc::clone(pg) as Arc<dyn SubscriberStore>,
        None => Arc::new(MemorySubscriberStore::new()),
    };

    // Build application state
    let patreon = Arc::new(HttpPatreonClient::new(&config.patreon));
    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let listen_addr = config.listen_addr;
    let app_state = AppState::new(config, store, patreon);

    // Build router
    let app = with_docs(Router::new().merge(api::build_router()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pg) = postgres {
        pg.close().await;
    }
    tracing::info!("shutdown complete");

    Ok(())
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    ApiError::Internal("handler panicked".to_string()).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
