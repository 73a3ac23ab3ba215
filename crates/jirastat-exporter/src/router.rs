//! Axum router wiring.
//!
//! Exposes the metrics exposition and the two probes.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ops::metrics))
        .route("/liveness", get(ops::liveness))
        .route("/readiness", get(ops::readiness))
        .with_state(state)
}
