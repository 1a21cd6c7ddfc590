//! MetricSource trait definition and shared error types.

use async_trait::async_trait;

use libra_core::Rule;

/// Errors that can occur while sampling a metric.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// The rule has no `metric_name` configured.
    #[error("missing metric_name for rule '{0}'")]
    MissingMetricName(String),

    /// The upstream metrics service was unreachable or timed out.
    #[error("metric query failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The query succeeded but returned no datapoints. Treated as a
    /// per-tick skip by the evaluator, not a fault.
    #[error("no datapoints found for metric '{0}'")]
    NoData(String),

    /// The backend answered with something we could not interpret.
    #[error("unexpected response from metrics backend: {0}")]
    Malformed(String),

    /// An AWS SDK error (stringified).
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl MetricError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, MetricError::NoData(_))
    }
}

/// Capability of a metrics backend: resolve a rule's query to the
/// current scalar value.
///
/// Implementations do no caching; every call is a fresh query against
/// the upstream service.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn current_value(&self, rule: &Rule) -> Result<f64, MetricError>;
}
