//! Operational HTTP endpoints.
//!
//! - `/liveness`  : always 200
//! - `/readiness` : one live upstream page-zero fetch (503 on failure or when draining)
//! - `/metrics`   : Prometheus text format

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::upstream::fetch_page_counted;

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining");
    }

    let source = state.source();
    let metrics = state.metrics();
    match fetch_page_counted(source.as_ref(), &metrics, "readiness", 0).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, class = e.class().as_str(), "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable")
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.store().render(&state.metrics());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
