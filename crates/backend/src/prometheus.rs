//! Prometheus instant-query metric source.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use libra_core::Rule;

use crate::traits::{MetricError, MetricSource};

/// Executes instant queries against a Prometheus HTTP API and returns
/// the scalar result, or the first sample of a vector result.
#[derive(Debug)]
pub struct PrometheusSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstantQueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Value,
}

impl PrometheusSource {
    pub fn new(host: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: host.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl MetricSource for PrometheusSource {
    async fn current_value(&self, rule: &Rule) -> Result<f64, MetricError> {
        if rule.metric_name.is_empty() {
            return Err(MetricError::MissingMetricName(rule.name.clone()));
        }

        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", rule.metric_name.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let body: InstantQueryResponse = response.json().await?;

        instant_value(&body, &rule.metric_name)
    }
}

/// Extract the scalar from an instant-query response.
///
/// A `scalar` result is `[ts, "value"]`; a `vector` result is a list of
/// samples whose `value` fields have the same shape. The first vector
/// sample wins; an empty vector is [`MetricError::NoData`].
pub(crate) fn instant_value(
    body: &InstantQueryResponse,
    metric: &str,
) -> Result<f64, MetricError> {
    if body.status != "success" {
        return Err(MetricError::Malformed(format!(
            "query status '{}' for '{}'",
            body.status, metric
        )));
    }
    let data = body
        .data
        .as_ref()
        .ok_or_else(|| MetricError::Malformed(format!("missing data for '{metric}'")))?;

    let sample = match data.result_type.as_str() {
        "scalar" => data.result.clone(),
        "vector" => match data.result.as_array().and_then(|v| v.first()) {
            Some(sample) => sample
                .get("value")
                .cloned()
                .ok_or_else(|| MetricError::Malformed(format!("vector sample without value for '{metric}'")))?,
            None => return Err(MetricError::NoData(metric.to_string())),
        },
        other => {
            return Err(MetricError::Malformed(format!(
                "unsupported result type '{other}' for '{metric}'"
            )))
        }
    };

    parse_sample(&sample, metric)
}

/// A sample is a `[timestamp, "value"]` pair with the value as a string.
fn parse_sample(sample: &Value, metric: &str) -> Result<f64, MetricError> {
    sample
        .as_array()
        .and_then(|pair| pair.get(1))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| MetricError::Malformed(format!("unparseable sample for '{metric}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> InstantQueryResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn scalar_result() {
        let body = parse(r#"{"status":"success","data":{"resultType":"scalar","result":[1700000000,"42.5"]}}"#);
        assert_eq!(instant_value(&body, "up").unwrap(), 42.5);
    }

    #[test]
    fn vector_result_takes_first_sample() {
        let body = parse(
            r#"{"status":"success","data":{"resultType":"vector","result":[
                {"metric":{"instance":"a"},"value":[1700000000,"7"]},
                {"metric":{"instance":"b"},"value":[1700000000,"9"]}
            ]}}"#,
        );
        assert_eq!(instant_value(&body, "up").unwrap(), 7.0);
    }

    #[test]
    fn empty_vector_is_no_data() {
        let body = parse(r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#);
        assert!(instant_value(&body, "up").unwrap_err().is_no_data());
    }

    #[test]
    fn error_status_is_malformed() {
        let body = parse(r#"{"status":"error"}"#);
        assert!(matches!(
            instant_value(&body, "up"),
            Err(MetricError::Malformed(_))
        ));
    }

    #[test]
    fn matrix_result_is_rejected() {
        let body = parse(r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#);
        assert!(matches!(
            instant_value(&body, "up"),
            Err(MetricError::Malformed(_))
        ));
    }
}
