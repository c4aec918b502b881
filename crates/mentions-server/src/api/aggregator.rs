use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;

use super::{ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct RunTriggered {
    started: bool,
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse::new(state.aggregator.status(), req_id))
}

/// Start a cycle in the background. A busy aggregator answers `started: false`.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let started = state.aggregator.trigger();
    if !started {
        tracing::info!(request_id = %req_id.0, "run requested while a cycle is running");
    }
    let status = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(ApiResponse::new(RunTriggered { started }, req_id)))
}
