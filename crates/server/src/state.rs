use std::sync::Arc;

use libra_backend::ConfiguredBackends;
use libra_core::RootConfig;
use libra_nomad::ScalingExecutor;

/// Shared application state.
///
/// Everything here is immutable after startup; the executor owns the
/// only runtime mutable state (per-group locks) internally, so handlers
/// share the whole struct behind a plain `Arc` without locking.
pub struct AppState {
    pub config: RootConfig,
    pub backends: ConfiguredBackends,
    pub executor: Arc<ScalingExecutor>,
}
