//! REST endpoint handlers organized by resource.

pub mod oauth;
pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes the Patreon routes mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::routes())
        .merge(oauth::routes())
}
