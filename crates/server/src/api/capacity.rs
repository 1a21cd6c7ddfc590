//! Capacity requests: set a group's count to an absolute target.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info};

use crate::state::AppState;

use super::scale::{ScaleRequest, ScaleResponse};
use super::{bad_request, internal_error, ErrorResponse};

/// Set a task group to an absolute count, clamped to the group's bounds.
#[utoipa::path(
    post,
    path = "/capacity",
    tag = "Scaling",
    request_body = ScaleRequest,
    responses(
        (status = 200, description = "Capacity set", body = ScaleResponse),
        (status = 400, description = "Unknown job/group or malformed body", body = ErrorResponse),
        (status = 500, description = "Scheduler failure", body = ErrorResponse)
    )
)]
pub async fn capacity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScaleRequest>,
) -> Result<Json<ScaleResponse>, (StatusCode, Json<ErrorResponse>)> {
    let group = state
        .config
        .group(&req.job, &req.group)
        .ok_or_else(|| bad_request(format!("unknown group '{}/{}'", req.job, req.group)))?;

    let outcome = state
        .executor
        .apply_capacity(&req.job, &req.group, req.count, group.min_count, group.max_count)
        .await
        .map_err(|e| {
            error!(job = %req.job, group = %req.group, error = %e, "problem setting group capacity");
            internal_error(e.to_string())
        })?;

    info!(
        job = %req.job,
        group = %req.group,
        desired = req.count,
        new_count = outcome.new_count,
        "capacity request handled"
    );
    Ok(Json(ScaleResponse {
        eval: outcome.eval_id.unwrap_or_default(),
        new_count: outcome.new_count,
    }))
}
