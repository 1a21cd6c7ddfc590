//! Libra HTTP server: router construction and background wiring.
//!
//! The binary lives in `main.rs`; this lib exposes the router and state
//! so handler tests can drive the real service in-process.

pub mod api;
pub mod app_config;
pub mod rule_runner;
pub mod startup;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scale", post(api::scale))
        .route("/capacity", post(api::capacity))
        .route("/restart", post(api::restart))
        .route("/grafana", post(api::grafana))
        .route("/backends", get(api::backends))
        .route("/ping", get(api::ping))
        .route("/", get(api::home))
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
