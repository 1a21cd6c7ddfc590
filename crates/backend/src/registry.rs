//! Startup registry: turn backend specs into live metric sources.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use libra_core::BackendSpec;

use crate::cloudwatch::CloudWatchSource;
use crate::graphite::GraphiteSource;
use crate::prometheus::PrometheusSource;
use crate::traits::MetricSource;

/// Fallback environment variable for graphite backends configured
/// without an inline password.
pub const GRAPHITE_PASSWORD_ENV: &str = "GRAPHITE_PASSWORD";

/// Errors raised while constructing backends. All fatal at startup: a
/// rule bound to an unresolvable backend must never silently no-op.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("missing backend kind for '{0}'")]
    MissingKind(String),

    #[error("unknown backend kind '{kind}' for backend '{name}'")]
    UnknownKind { name: String, kind: String },

    #[error("bad configuration for '{name}': {reason}")]
    BadConfig { name: String, reason: String },
}

/// The supported metric backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Cloudwatch,
    Graphite,
    Prometheus,
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloudwatch" => Ok(BackendKind::Cloudwatch),
            "graphite" => Ok(BackendKind::Graphite),
            "prometheus" => Ok(BackendKind::Prometheus),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendKind::Cloudwatch => "cloudwatch",
            BackendKind::Graphite => "graphite",
            BackendKind::Prometheus => "prometheus",
        };
        f.write_str(label)
    }
}

/// A metric source constructed once at startup, shared for the process
/// lifetime.
#[derive(Clone)]
pub struct ConfiguredBackend {
    pub kind: BackendKind,
    pub source: Arc<dyn MetricSource>,
}

pub type ConfiguredBackends = HashMap<String, ConfiguredBackend>;

/// Build every configured backend from the already-parsed config.
///
/// `timeout` bounds each outbound metric query. Any unresolvable entry
/// aborts startup.
pub async fn initialize_backends(
    specs: &IndexMap<String, BackendSpec>,
    timeout: Duration,
) -> Result<ConfiguredBackends, BackendError> {
    let mut backends = ConfiguredBackends::with_capacity(specs.len());

    for (name, spec) in specs {
        if spec.kind.is_empty() {
            return Err(BackendError::MissingKind(name.clone()));
        }
        let kind: BackendKind = spec
            .kind
            .parse()
            .map_err(|_| BackendError::UnknownKind {
                name: name.clone(),
                kind: spec.kind.clone(),
            })?;

        let source: Arc<dyn MetricSource> = match kind {
            BackendKind::Cloudwatch => Arc::new(CloudWatchSource::new(spec.region.clone()).await),
            BackendKind::Graphite => {
                if spec.host.is_empty() {
                    return Err(BackendError::BadConfig {
                        name: name.clone(),
                        reason: "graphite backend requires a host".to_string(),
                    });
                }
                let source = GraphiteSource::new(
                    spec.host.clone(),
                    spec.username.clone(),
                    resolve_graphite_password(spec),
                    timeout,
                )
                .map_err(|e| BackendError::BadConfig {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                Arc::new(source)
            }
            BackendKind::Prometheus => {
                if spec.host.is_empty() {
                    return Err(BackendError::BadConfig {
                        name: name.clone(),
                        reason: "prometheus backend requires a host".to_string(),
                    });
                }
                let source = PrometheusSource::new(spec.host.clone(), timeout).map_err(|e| {
                    BackendError::BadConfig {
                        name: name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Arc::new(source)
            }
        };

        backends.insert(name.clone(), ConfiguredBackend { kind, source });
        info!(backend = %name, kind = %kind, "configured metric backend");
    }

    Ok(backends)
}

/// Inline password wins; otherwise fall back to the environment.
fn resolve_graphite_password(spec: &BackendSpec) -> String {
    if spec.password.is_empty() {
        std::env::var(GRAPHITE_PASSWORD_ENV).unwrap_or_default()
    } else {
        spec.password.clone()
    }
}
