//! HTTP endpoint modules, one per responsibility area.
//!
//! Shared error shapes and helpers live here in mod.rs.

pub(crate) mod backends;
pub(crate) mod capacity;
pub(crate) mod doc;
pub(crate) mod grafana;
pub(crate) mod health;
pub(crate) mod restart;
pub(crate) mod scale;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

pub(crate) fn internal_error(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: msg.into() }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────
// Preserves flat `api::foo` paths used by route registration.

pub use backends::backends;
pub use capacity::capacity;
pub use grafana::grafana;
pub use health::{home, ping};
pub use restart::restart;
pub use scale::scale;
