//! Graphite render-API metric source.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use libra_core::Rule;

use crate::traits::{MetricError, MetricSource};

/// Queries a Graphite-compatible render endpoint and reports the latest
/// datapoint of the first returned series.
#[derive(Debug)]
pub struct GraphiteSource {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

/// One series in a `/render?format=json` response. Datapoints are
/// `[value, timestamp]` pairs where the value may be null for windows
/// Graphite has not filled yet.
#[derive(Debug, Deserialize)]
pub(crate) struct RenderSeries {
    #[allow(dead_code)]
    pub target: String,
    pub datapoints: Vec<(Option<f64>, i64)>,
}

impl GraphiteSource {
    pub fn new(
        host: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: host.trim_end_matches('/').to_string(),
            username,
            password,
            client,
        })
    }
}

#[async_trait]
impl MetricSource for GraphiteSource {
    async fn current_value(&self, rule: &Rule) -> Result<f64, MetricError> {
        if rule.metric_name.is_empty() {
            return Err(MetricError::MissingMetricName(rule.name.clone()));
        }

        let url = format!("{}/render", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("target", rule.metric_name.as_str()), ("format", "json")]);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?.error_for_status()?;
        let series: Vec<RenderSeries> = response.json().await?;

        latest_value(&series, &rule.metric_name)
    }
}

/// Pick the most recent non-null value from the first series.
pub(crate) fn latest_value(series: &[RenderSeries], metric: &str) -> Result<f64, MetricError> {
    let first = series
        .first()
        .ok_or_else(|| MetricError::NoData(metric.to_string()))?;

    first
        .datapoints
        .iter()
        .rev()
        .find_map(|(value, _)| *value)
        .ok_or_else(|| MetricError::NoData(metric.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(datapoints: Vec<(Option<f64>, i64)>) -> RenderSeries {
        RenderSeries {
            target: "servers.api.cpu".to_string(),
            datapoints,
        }
    }

    #[test]
    fn latest_value_takes_last_datapoint() {
        let s = vec![series(vec![(Some(1.0), 100), (Some(2.0), 160), (Some(3.0), 220)])];
        assert_eq!(latest_value(&s, "m").unwrap(), 3.0);
    }

    #[test]
    fn latest_value_skips_trailing_nulls() {
        let s = vec![series(vec![(Some(42.5), 100), (None, 160), (None, 220)])];
        assert_eq!(latest_value(&s, "m").unwrap(), 42.5);
    }

    #[test]
    fn empty_response_is_no_data() {
        let err = latest_value(&[], "servers.api.cpu").unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn all_null_series_is_no_data() {
        let s = vec![series(vec![(None, 100), (None, 160)])];
        assert!(latest_value(&s, "m").unwrap_err().is_no_data());
    }

    #[test]
    fn render_response_deserializes() {
        let body = r#"[{"target": "servers.api.cpu", "datapoints": [[1.5, 1700000000], [null, 1700000060]]}]"#;
        let parsed: Vec<RenderSeries> = serde_json::from_str(body).unwrap();
        assert_eq!(latest_value(&parsed, "m").unwrap(), 1.5);
    }
}
