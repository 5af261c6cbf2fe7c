//! HTTP endpoints.
//!
//! - `/`         : landing page linking to the metrics path
//! - `<metrics>` : Prometheus text format
//! - `/healthz`  : liveness
//! - `/readyz`   : readiness (503 when draining)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::app_state::AppState;

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html().to_string())
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.registry().render();
    // Counted after rendering, so a scrape sees the requests before it.
    state.record_scrape(StatusCode::OK.as_u16());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}
