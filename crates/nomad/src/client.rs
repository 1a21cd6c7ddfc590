//! HTTP client for the Nomad API.
//!
//! Every operation is a fresh read-modify-write of the job definition:
//! fetch `GET /v1/job/{id}`, mutate the JSON spec in place, resubmit via
//! `POST /v1/job/{id}`. The spec is kept as [`serde_json::Value`] so
//! fields this crate does not know about round-trip untouched.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use libra_core::config::{env_opt, env_or};

use crate::traits::{NomadError, Scheduler};

/// Meta key touched to force a new job version when a restart keeps the
/// same image.
const RESTART_META_KEY: &str = "libra_restarted_at";

/// Nomad connection settings, read from the standard Nomad environment.
#[derive(Debug, Clone)]
pub struct NomadConfig {
    pub address: String,
    pub token: Option<String>,
}

impl NomadConfig {
    pub fn from_env() -> Self {
        Self {
            address: env_or("NOMAD_ADDR", "http://127.0.0.1:4646"),
            token: env_opt("NOMAD_TOKEN"),
        }
    }
}

pub struct NomadClient {
    http: reqwest::Client,
    address: String,
    token: Option<String>,
}

impl NomadClient {
    pub fn new(config: NomadConfig, timeout: Duration) -> Result<Self, NomadError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Probe the agent once at startup. The control plane refuses to
    /// run against an unreachable scheduler.
    pub async fn verify_connection(&self) -> Result<(), NomadError> {
        let agent = self.get("/v1/agent/self").await?;
        let datacenter = agent
            .get("config")
            .and_then(|c| c.get("Datacenter"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(address = %self.address, datacenter = %datacenter, "connected to Nomad");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Value, NomadError> {
        let mut request = self.http.get(format!("{}{}", self.address, path));
        if let Some(token) = &self.token {
            request = request.header("X-Nomad-Token", token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Fetch the live definition of a job.
    async fn fetch_job(&self, job: &str) -> Result<Value, NomadError> {
        let mut request = self.http.get(format!("{}/v1/job/{}", self.address, job));
        if let Some(token) = &self.token {
            request = request.header("X-Nomad-Token", token);
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NomadError::JobNotFound(job.to_string()));
        }
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Submit an updated job spec, returning the evaluation ID.
    async fn submit_job(&self, job: &str, spec: Value) -> Result<String, NomadError> {
        let mut request = self
            .http
            .post(format!("{}/v1/job/{}", self.address, job))
            .json(&json!({ "Job": spec }));
        if let Some(token) = &self.token {
            request = request.header("X-Nomad-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NomadError::Conflict(format!("{status}: {body}")));
        }

        let body: Value = response.json().await?;
        body.get("EvalID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| NomadError::Malformed(format!("job '{job}' register response without EvalID")))
    }
}

/// Find a task group by name inside a job spec.
fn group_mut<'a>(spec: &'a mut Value, job: &str, group: &str) -> Result<&'a mut Value, NomadError> {
    spec.get_mut("TaskGroups")
        .and_then(Value::as_array_mut)
        .and_then(|groups| {
            groups
                .iter_mut()
                .find(|g| g.get("Name").and_then(Value::as_str) == Some(group))
        })
        .ok_or_else(|| NomadError::GroupNotFound {
            job: job.to_string(),
            group: group.to_string(),
        })
}

fn task_mut<'a>(
    group_spec: &'a mut Value,
    job: &str,
    group: &str,
    task: &str,
) -> Result<&'a mut Value, NomadError> {
    group_spec
        .get_mut("Tasks")
        .and_then(Value::as_array_mut)
        .and_then(|tasks| {
            tasks
                .iter_mut()
                .find(|t| t.get("Name").and_then(Value::as_str) == Some(task))
        })
        .ok_or_else(|| NomadError::TaskNotFound {
            job: job.to_string(),
            group: group.to_string(),
            task: task.to_string(),
        })
}

#[async_trait]
impl Scheduler for NomadClient {
    async fn group_count(&self, job: &str, group: &str) -> Result<i64, NomadError> {
        let mut spec = self.fetch_job(job).await?;
        let group_spec = group_mut(&mut spec, job, group)?;
        group_spec
            .get("Count")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                NomadError::Malformed(format!("group '{job}/{group}' has no Count"))
            })
    }

    async fn set_group_count(
        &self,
        job: &str,
        group: &str,
        count: i64,
    ) -> Result<String, NomadError> {
        let mut spec = self.fetch_job(job).await?;
        let group_spec = group_mut(&mut spec, job, group)?;
        group_spec["Count"] = json!(count);
        self.submit_job(job, spec).await
    }

    async fn restart_task(
        &self,
        job: &str,
        group: &str,
        task: &str,
        image: &str,
    ) -> Result<String, NomadError> {
        let mut spec = self.fetch_job(job).await?;
        let group_spec = group_mut(&mut spec, job, group)?;
        let task_spec = task_mut(group_spec, job, group, task)?;

        let current_image = task_spec
            .get("Config")
            .and_then(|c| c.get("image"))
            .and_then(Value::as_str);

        if current_image == Some(image) {
            // Same image: touch task meta so the spec diffs and Nomad
            // schedules a fresh deployment.
            if !task_spec.get("Meta").map(Value::is_object).unwrap_or(false) {
                task_spec["Meta"] = json!({});
            }
            task_spec["Meta"][RESTART_META_KEY] = json!(chrono::Utc::now().to_rfc3339());
        } else {
            if !task_spec.get("Config").map(Value::is_object).unwrap_or(false) {
                task_spec["Config"] = json!({});
            }
            task_spec["Config"]["image"] = json!(image);
        }

        self.submit_job(job, spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_spec() -> Value {
        json!({
            "ID": "api",
            "TaskGroups": [
                {
                    "Name": "web",
                    "Count": 5,
                    "Tasks": [
                        { "Name": "nginx", "Config": { "image": "nginx:1.25" } }
                    ]
                },
                { "Name": "worker", "Count": 2, "Tasks": [] }
            ]
        })
    }

    #[test]
    fn group_mut_finds_named_group() {
        let mut spec = job_spec();
        let group = group_mut(&mut spec, "api", "worker").unwrap();
        assert_eq!(group["Count"], json!(2));
    }

    #[test]
    fn group_mut_missing_group_errors() {
        let mut spec = job_spec();
        assert!(matches!(
            group_mut(&mut spec, "api", "db"),
            Err(NomadError::GroupNotFound { .. })
        ));
    }

    #[test]
    fn task_mut_missing_task_errors() {
        let mut spec = job_spec();
        let group = group_mut(&mut spec, "api", "web").unwrap();
        assert!(matches!(
            task_mut(group, "api", "web", "sidecar"),
            Err(NomadError::TaskNotFound { .. })
        ));
    }

    #[test]
    fn count_update_preserves_unknown_fields() {
        let mut spec = job_spec();
        let group = group_mut(&mut spec, "api", "web").unwrap();
        group["Count"] = json!(7);

        assert_eq!(spec["TaskGroups"][0]["Count"], json!(7));
        assert_eq!(spec["ID"], json!("api"));
        assert_eq!(
            spec["TaskGroups"][0]["Tasks"][0]["Config"]["image"],
            json!("nginx:1.25")
        );
    }
}
