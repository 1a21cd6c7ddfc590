//! Scheduler trait definition and shared error types.

use async_trait::async_trait;

/// Errors surfaced by the scheduler adapter. Nothing here is retried
/// internally; callers decide whether the next tick or request retries.
#[derive(Debug, thiserror::Error)]
pub enum NomadError {
    /// The scheduler was unreachable or the request timed out.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job '{0}' not found")]
    JobNotFound(String),

    #[error("group '{group}' not found in job '{job}'")]
    GroupNotFound { job: String, group: String },

    #[error("task '{task}' not found in group '{job}/{group}'")]
    TaskNotFound {
        job: String,
        group: String,
        task: String,
    },

    /// The scheduler rejected the submitted job spec.
    #[error("scheduler rejected the write: {0}")]
    Conflict(String),

    /// The job spec or response had an unexpected shape.
    #[error("unexpected scheduler response: {0}")]
    Malformed(String),
}

/// Capability of the cluster scheduler as consumed by the engine.
///
/// Implementations must re-read the live job definition on every call
/// (no local caching) so the read-modify-write cycle never submits a
/// stale spec. Bounds enforcement is not this layer's job: whatever
/// count the caller provides is submitted as-is.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Current declared count of the group, read from the live job.
    async fn group_count(&self, job: &str, group: &str) -> Result<i64, NomadError>;

    /// Set the group's count and submit the job. Returns the
    /// scheduler-issued evaluation ID.
    async fn set_group_count(&self, job: &str, group: &str, count: i64)
        -> Result<String, NomadError>;

    /// Update the task's container image (or force a redeploy when the
    /// image is unchanged) and resubmit the job.
    async fn restart_task(
        &self,
        job: &str,
        group: &str,
        task: &str,
        image: &str,
    ) -> Result<String, NomadError>;
}
