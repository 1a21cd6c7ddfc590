//! Direct scale requests: apply a signed delta to a group's count.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::state::AppState;

use super::{bad_request, internal_error, ErrorResponse};

/// Body shared by `/scale` (signed delta) and `/capacity` (absolute
/// target).
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScaleRequest {
    pub job: String,
    pub group: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScaleResponse {
    /// Evaluation ID of the submitted write; empty when no write was
    /// needed.
    pub eval: String,
    pub new_count: i64,
}

/// Scale a task group by a signed delta, clamped to the group's bounds.
#[utoipa::path(
    post,
    path = "/scale",
    tag = "Scaling",
    request_body = ScaleRequest,
    responses(
        (status = 200, description = "Scale applied", body = ScaleResponse),
        (status = 400, description = "Unknown job/group or malformed body", body = ErrorResponse),
        (status = 500, description = "Zero delta or scheduler failure", body = ErrorResponse)
    )
)]
pub async fn scale(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScaleRequest>,
) -> Result<Json<ScaleResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.count == 0 {
        error!("amount to increment or decrement cannot be 0");
        return Err(internal_error("amount to increment or decrement cannot be 0"));
    }

    let group = state
        .config
        .group(&req.job, &req.group)
        .ok_or_else(|| bad_request(format!("unknown group '{}/{}'", req.job, req.group)))?;

    let outcome = state
        .executor
        .apply_scale(&req.job, &req.group, req.count, group.min_count, group.max_count)
        .await
        .map_err(|e| {
            error!(job = %req.job, group = %req.group, error = %e, "problem scaling the task group");
            internal_error(e.to_string())
        })?;

    info!(
        job = %req.job,
        group = %req.group,
        delta = req.count,
        new_count = outcome.new_count,
        "scale request handled"
    );
    Ok(Json(ScaleResponse {
        eval: outcome.eval_id.unwrap_or_default(),
        new_count: outcome.new_count,
    }))
}
