//! Liveness endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HomeResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "Status",
    responses((status = 200, description = "Server is alive", body = String))
)]
pub async fn ping() -> &'static str {
    "pong"
}

/// Service identity.
#[utoipa::path(
    get,
    path = "/",
    tag = "Status",
    responses((status = 200, description = "Service name and version", body = HomeResponse))
)]
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        name: "libra",
        version: env!("CARGO_PKG_VERSION"),
    })
}
