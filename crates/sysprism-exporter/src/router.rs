//! Axum router wiring.
//!
//! The metrics route is mounted at the configured path; config validation
//! keeps it clear of the built-in routes.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.cfg().exporter.metrics_path.clone();
    Router::new()
        .route("/", get(ops::index))
        .route(&metrics_path, get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .with_state(state)
}
