//! Scaling executor: bounded arithmetic plus per-group serialization.
//!
//! Every mutating path in the control plane (rule ticks, direct scale
//! and capacity requests, webhook alerts, restarts) goes through this
//! type. Each `(job, group)` pair has its own async mutex held across
//! the whole read-modify-write cycle, so two near-simultaneous scales
//! of one group cannot both read the same count and lose an update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use libra_core::scale::{scale, set_capacity, Decision};

use crate::traits::{NomadError, Scheduler};

/// Result of a scale or capacity request.
#[derive(Debug)]
pub struct ScaleOutcome {
    /// Evaluation ID of the submitted write, or `None` when the count
    /// was already where it should be and no write was issued.
    pub eval_id: Option<String>,
    pub new_count: i64,
    pub decision: Decision,
}

type GroupKey = (String, String);

pub struct ScalingExecutor {
    scheduler: Arc<dyn Scheduler>,
    locks: Mutex<HashMap<GroupKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScalingExecutor {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lazily create the lock guarding one task group.
    fn group_lock(&self, job: &str, group: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("group lock map poisoned");
        locks
            .entry((job.to_string(), group.to_string()))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Apply a signed delta to a group's count, clamped to `[min, max]`.
    pub async fn apply_scale(
        &self,
        job: &str,
        group: &str,
        delta: i64,
        min: i64,
        max: i64,
    ) -> Result<ScaleOutcome, NomadError> {
        let lock = self.group_lock(job, group);
        let _guard = lock.lock().await;

        let current = self.scheduler.group_count(job, group).await?;
        let (new_count, decision) = scale(current, delta, min, max);
        self.finish(job, group, current, new_count, decision).await
    }

    /// Set a group's count to an absolute target, clamped to `[min, max]`.
    pub async fn apply_capacity(
        &self,
        job: &str,
        group: &str,
        desired: i64,
        min: i64,
        max: i64,
    ) -> Result<ScaleOutcome, NomadError> {
        let lock = self.group_lock(job, group);
        let _guard = lock.lock().await;

        let current = self.scheduler.group_count(job, group).await?;
        let (new_count, decision) = set_capacity(current, desired, min, max);
        self.finish(job, group, current, new_count, decision).await
    }

    /// Restart a task, serialized with scales of the same group.
    pub async fn restart(
        &self,
        job: &str,
        group: &str,
        task: &str,
        image: &str,
    ) -> Result<String, NomadError> {
        let lock = self.group_lock(job, group);
        let _guard = lock.lock().await;

        let eval_id = self.scheduler.restart_task(job, group, task, image).await?;
        info!(job = %job, group = %group, task = %task, image = %image, eval = %eval_id, "restarted task");
        Ok(eval_id)
    }

    async fn finish(
        &self,
        job: &str,
        group: &str,
        current: i64,
        new_count: i64,
        decision: Decision,
    ) -> Result<ScaleOutcome, NomadError> {
        if new_count == current {
            // Covers no-ops and clamps that land on the current count
            // (e.g. scaling up a group already at max). Clamps are an
            // outcome worth logging even without a write.
            if decision.is_clamped() {
                warn!(
                    job = %job,
                    group = %group,
                    count = current,
                    decision = decision.label(),
                    "scale clamped at bound; count unchanged"
                );
            } else {
                debug!(job = %job, group = %group, count = current, "scale is a no-op");
            }
            return Ok(ScaleOutcome {
                eval_id: None,
                new_count: current,
                decision,
            });
        }

        let eval_id = self.scheduler.set_group_count(job, group, new_count).await?;
        if decision.is_clamped() {
            warn!(
                job = %job,
                group = %group,
                from = current,
                to = new_count,
                decision = decision.label(),
                eval = %eval_id,
                "scale clamped to group bound"
            );
        } else {
            info!(
                job = %job,
                group = %group,
                from = current,
                to = new_count,
                eval = %eval_id,
                "scaled task group"
            );
        }

        Ok(ScaleOutcome {
            eval_id: Some(eval_id),
            new_count,
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// In-memory scheduler with one group, a deliberately slow read to
    /// widen the read-modify-write race window, and a write log.
    struct MemScheduler {
        count: tokio::sync::Mutex<i64>,
        writes: tokio::sync::Mutex<Vec<i64>>,
        evals: AtomicU64,
    }

    impl MemScheduler {
        fn with_count(count: i64) -> Arc<Self> {
            Arc::new(Self {
                count: tokio::sync::Mutex::new(count),
                writes: tokio::sync::Mutex::new(Vec::new()),
                evals: AtomicU64::new(0),
            })
        }

        async fn writes(&self) -> Vec<i64> {
            self.writes.lock().await.clone()
        }
    }

    #[async_trait]
    impl Scheduler for MemScheduler {
        async fn group_count(&self, _job: &str, _group: &str) -> Result<i64, NomadError> {
            let count = *self.count.lock().await;
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(count)
        }

        async fn set_group_count(
            &self,
            _job: &str,
            _group: &str,
            count: i64,
        ) -> Result<String, NomadError> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            *self.count.lock().await = count;
            self.writes.lock().await.push(count);
            let id = self.evals.fetch_add(1, Ordering::SeqCst);
            Ok(format!("eval-{id}"))
        }

        async fn restart_task(
            &self,
            _job: &str,
            _group: &str,
            _task: &str,
            _image: &str,
        ) -> Result<String, NomadError> {
            let id = self.evals.fetch_add(1, Ordering::SeqCst);
            Ok(format!("eval-{id}"))
        }
    }

    #[tokio::test]
    async fn scale_up_within_bounds_writes_new_count() {
        let scheduler = MemScheduler::with_count(5);
        let executor = ScalingExecutor::new(scheduler.clone());

        let outcome = executor.apply_scale("api", "web", 2, 2, 10).await.unwrap();

        assert_eq!(outcome.new_count, 7);
        assert_eq!(outcome.decision, Decision::Applied);
        assert!(outcome.eval_id.is_some());
        assert_eq!(scheduler.writes().await, vec![7]);
    }

    #[tokio::test]
    async fn scale_clamps_to_max_and_writes() {
        let scheduler = MemScheduler::with_count(5);
        let executor = ScalingExecutor::new(scheduler.clone());

        let outcome = executor.apply_scale("api", "web", 2, 2, 6).await.unwrap();

        assert_eq!(outcome.new_count, 6);
        assert_eq!(outcome.decision, Decision::ClampedHigh);
        assert_eq!(scheduler.writes().await, vec![6]);
    }

    #[tokio::test]
    async fn scale_at_max_issues_no_write() {
        let scheduler = MemScheduler::with_count(6);
        let executor = ScalingExecutor::new(scheduler.clone());

        let outcome = executor.apply_scale("api", "web", 3, 2, 6).await.unwrap();

        assert_eq!(outcome.new_count, 6);
        assert!(outcome.eval_id.is_none());
        assert!(scheduler.writes().await.is_empty());
    }

    #[tokio::test]
    async fn zero_delta_issues_no_write() {
        let scheduler = MemScheduler::with_count(5);
        let executor = ScalingExecutor::new(scheduler.clone());

        let outcome = executor.apply_scale("api", "web", 0, 2, 10).await.unwrap();

        assert_eq!(outcome.decision, Decision::Noop);
        assert!(outcome.eval_id.is_none());
        assert!(scheduler.writes().await.is_empty());
    }

    #[tokio::test]
    async fn capacity_round_trip_issues_no_write() {
        let scheduler = MemScheduler::with_count(5);
        let executor = ScalingExecutor::new(scheduler.clone());

        let current = scheduler.group_count("api", "web").await.unwrap();
        let outcome = executor
            .apply_capacity("api", "web", current, 2, 10)
            .await
            .unwrap();

        assert_eq!(outcome.new_count, 5);
        assert!(outcome.eval_id.is_none());
        assert!(scheduler.writes().await.is_empty());
    }

    #[tokio::test]
    async fn capacity_clamps_to_bounds() {
        let scheduler = MemScheduler::with_count(5);
        let executor = ScalingExecutor::new(scheduler.clone());

        let outcome = executor
            .apply_capacity("api", "web", 20, 2, 10)
            .await
            .unwrap();

        assert_eq!(outcome.new_count, 10);
        assert_eq!(outcome.decision, Decision::ClampedHigh);
        assert_eq!(scheduler.writes().await, vec![10]);
    }

    #[tokio::test]
    async fn concurrent_scales_of_one_group_are_serialized() {
        let scheduler = MemScheduler::with_count(0);
        let executor = Arc::new(ScalingExecutor::new(scheduler.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let executor = executor.clone();
            tasks.spawn(async move { executor.apply_scale("api", "web", 1, 0, 10).await });
        }

        let mut evals = Vec::new();
        while let Some(result) = tasks.join_next().await {
            let outcome = result.unwrap().unwrap();
            evals.push(outcome.eval_id.unwrap());
        }

        // Without per-group serialization two tasks could read the same
        // count and both write N+1, losing an increment.
        assert_eq!(*scheduler.count.lock().await, 6);
        assert_eq!(scheduler.writes().await.len(), 6);
        evals.sort();
        evals.dedup();
        assert_eq!(evals.len(), 6);
    }

    #[tokio::test]
    async fn concurrent_scales_respect_max() {
        let scheduler = MemScheduler::with_count(8);
        let executor = Arc::new(ScalingExecutor::new(scheduler.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let executor = executor.clone();
            tasks.spawn(async move { executor.apply_scale("api", "web", 1, 0, 10).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(*scheduler.count.lock().await, 10);
        // Only the first two increments moved the count; the rest were
        // clamps at the bound with no write.
        assert_eq!(scheduler.writes().await.len(), 2);
    }

    #[tokio::test]
    async fn restart_returns_eval_id() {
        let scheduler = MemScheduler::with_count(3);
        let executor = ScalingExecutor::new(scheduler.clone());

        let eval = executor
            .restart("api", "web", "nginx", "nginx:1.26")
            .await
            .unwrap();
        assert_eq!(eval, "eval-0");
    }
}
