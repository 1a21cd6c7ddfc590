//! Configured backend listing.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BackendResponse {
    pub name: String,
    pub kind: String,
}

/// List the configured metric backends.
#[utoipa::path(
    get,
    path = "/backends",
    tag = "Status",
    responses(
        (status = 200, description = "Configured backends", body = Vec<BackendResponse>)
    )
)]
pub async fn backends(State(state): State<Arc<AppState>>) -> Json<Vec<BackendResponse>> {
    let mut list: Vec<BackendResponse> = state
        .backends
        .iter()
        .map(|(name, backend)| BackendResponse {
            name: name.clone(),
            kind: backend.kind.to_string(),
        })
        .collect();

    list.sort_by(|a, b| a.name.cmp(&b.name));
    Json(list)
}
