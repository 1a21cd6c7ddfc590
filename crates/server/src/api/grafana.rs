//! Grafana alert webhook intake.
//!
//! The alert's `message` field carries a JSON policy shaped like a
//! scaling rule plus the target group and its bounds, so alert-driven
//! scaling runs through exactly the same classification and bounds
//! enforcement as scheduled rules.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use libra_core::ThresholdPolicy;
use libra_rules::classify;

use crate::state::AppState;

use super::scale::ScaleResponse;
use super::{bad_request, internal_error, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GrafanaRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub count: i64,
    /// JSON-encoded [`GrafanaMessageBody`].
    pub message: String,
    #[serde(rename = "evalMatches", default)]
    pub eval_matches: Vec<GrafanaEvalMatch>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GrafanaEvalMatch {
    #[serde(default)]
    pub metric: String,
    pub value: f64,
}

/// Policy embedded in the alert message: the target group, its bounds,
/// and a threshold policy identical in shape to a configured rule's.
#[derive(Debug, Serialize, Deserialize)]
pub struct GrafanaMessageBody {
    pub job: String,
    pub group: String,
    pub min_count: i64,
    pub max_count: i64,
    #[serde(flatten)]
    pub policy: ThresholdPolicy,
}

/// Accept a Grafana alert webhook and scale per its embedded policy.
#[utoipa::path(
    post,
    path = "/grafana",
    tag = "Alerts",
    request_body = GrafanaRequest,
    responses(
        (status = 200, description = "Alert handled; body present only when a scale was applied", body = ScaleResponse),
        (status = 400, description = "Malformed webhook or message payload", body = ErrorResponse),
        (status = 500, description = "Scheduler failure", body = ErrorResponse)
    )
)]
pub async fn grafana(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GrafanaRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let body: GrafanaMessageBody = serde_json::from_str(&req.message).map_err(|e| {
        error!(message = %req.message, error = %e, "problem parsing Grafana webhook message");
        bad_request(format!("bad alert message: {e}"))
    })?;

    let Some(first_match) = req.eval_matches.first() else {
        info!(alert = %req.title, "alert has been cleared; doing nothing");
        return Ok(StatusCode::OK.into_response());
    };

    // TODO: average every match instead of only reading the first.
    let Some(delta) = classify(&body.policy, first_match.value) else {
        return Ok(StatusCode::OK.into_response());
    };

    let outcome = state
        .executor
        .apply_scale(&body.job, &body.group, delta, body.min_count, body.max_count)
        .await
        .map_err(|e| {
            error!(job = %body.job, group = %body.group, error = %e, "problem scaling the task group");
            internal_error(e.to_string())
        })?;

    info!(
        alert = %req.title,
        job = %body.job,
        group = %body.group,
        value = first_match.value,
        delta,
        new_count = outcome.new_count,
        "alert-driven scale handled"
    );
    Ok(Json(ScaleResponse {
        eval: outcome.eval_id.unwrap_or_default(),
        new_count: outcome.new_count,
    })
    .into_response())
}
