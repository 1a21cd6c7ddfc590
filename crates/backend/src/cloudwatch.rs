//! CloudWatch metric source.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::Statistic;
use tracing::info;

use libra_core::Rule;

use crate::traits::{MetricError, MetricSource};

/// Window of recent data to inspect for the latest datapoint.
const LOOKBACK: Duration = Duration::from_secs(600);
/// Aggregation period requested from CloudWatch.
const PERIOD_SECS: i32 = 60;

/// Fetches the most recent average datapoint for a metric.
///
/// `rule.metric_name` carries both the namespace and the metric,
/// separated by the last slash: `AWS/EC2/CPUUtilization` queries metric
/// `CPUUtilization` in namespace `AWS/EC2`.
pub struct CloudWatchSource {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchSource {
    pub async fn new(region: String) -> Self {
        let region = aws_sdk_cloudwatch::config::Region::new(region);
        let aws_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .load()
            .await;
        let client = aws_sdk_cloudwatch::Client::new(&aws_cfg);

        info!(region = %region, "CloudWatch source initialised");
        Self { client }
    }
}

#[async_trait]
impl MetricSource for CloudWatchSource {
    async fn current_value(&self, rule: &Rule) -> Result<f64, MetricError> {
        if rule.metric_name.is_empty() {
            return Err(MetricError::MissingMetricName(rule.name.clone()));
        }
        let (namespace, metric) = split_metric_name(&rule.metric_name)
            .ok_or_else(|| MetricError::Malformed(format!(
                "cloudwatch metric '{}' must be 'Namespace/MetricName'",
                rule.metric_name
            )))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let start = now - LOOKBACK.as_secs() as i64;

        let output = self
            .client
            .get_metric_statistics()
            .namespace(namespace)
            .metric_name(metric)
            .start_time(DateTime::from_secs(start))
            .end_time(DateTime::from_secs(now))
            .period(PERIOD_SECS)
            .statistics(Statistic::Average)
            .send()
            .await
            .map_err(|e| MetricError::AwsSdk(e.to_string()))?;

        // Datapoints are unordered; take the newest one.
        output
            .datapoints()
            .iter()
            .filter_map(|d| Some((d.timestamp()?.secs(), d.average()?)))
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, avg)| avg)
            .ok_or_else(|| MetricError::NoData(rule.metric_name.clone()))
    }
}

fn split_metric_name(metric_name: &str) -> Option<(&str, &str)> {
    metric_name
        .rsplit_once('/')
        .filter(|(ns, m)| !ns.is_empty() && !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_slashes_in_namespace() {
        assert_eq!(
            split_metric_name("AWS/EC2/CPUUtilization"),
            Some(("AWS/EC2", "CPUUtilization"))
        );
    }

    #[test]
    fn split_plain_pair() {
        assert_eq!(split_metric_name("Custom/QueueDepth"), Some(("Custom", "QueueDepth")));
    }

    #[test]
    fn split_rejects_missing_namespace() {
        assert_eq!(split_metric_name("CPUUtilization"), None);
        assert_eq!(split_metric_name("/CPUUtilization"), None);
        assert_eq!(split_metric_name("AWS/EC2/"), None);
    }
}
