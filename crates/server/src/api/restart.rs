//! Rolling-restart requests: swap a task's image, or force a redeploy
//! of the current one.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::state::AppState;

use super::{internal_error, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RestartRequest {
    pub job: String,
    pub group: String,
    pub task: String,
    /// Image to deploy. May equal the running image; that forces a
    /// redeploy.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RestartResponse {
    pub eval: String,
}

/// Restart a task with the given image.
#[utoipa::path(
    post,
    path = "/restart",
    tag = "Scaling",
    request_body = RestartRequest,
    responses(
        (status = 200, description = "Restart submitted", body = RestartResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 500, description = "Scheduler failure", body = ErrorResponse)
    )
)]
pub async fn restart(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RestartRequest>,
) -> Result<Json<RestartResponse>, (StatusCode, Json<ErrorResponse>)> {
    let eval = state
        .executor
        .restart(&req.job, &req.group, &req.task, &req.image)
        .await
        .map_err(|e| {
            error!(job = %req.job, group = %req.group, task = %req.task, error = %e, "problem restarting the job");
            internal_error(e.to_string())
        })?;

    info!(job = %req.job, group = %req.group, task = %req.task, eval = %eval, "restart request handled");
    Ok(Json(RestartResponse { eval }))
}
