//! Per-rule evaluation: sample a metric, classify it against the
//! thresholds, and apply the resulting bounded scale action.

use std::sync::Arc;

use tracing::{debug, error, info};

use libra_backend::MetricSource;
use libra_core::{Rule, ScaleAction, ThresholdPolicy};
use libra_nomad::ScalingExecutor;

/// Map a sampled value onto a signed scale delta.
///
/// Values strictly below `min_threshold` select the min action, values
/// strictly above `max_threshold` select the max action; a value equal
/// to either threshold is in band. Returns `None` for in-band values
/// and for sides disabled with [`ScaleAction::None`].
pub fn classify(policy: &ThresholdPolicy, value: f64) -> Option<i64> {
    let (action, count) = if value < policy.min_threshold {
        (policy.min_action, policy.min_action_count)
    } else if value > policy.max_threshold {
        (policy.max_action, policy.max_action_count)
    } else {
        return None;
    };

    match action {
        ScaleAction::ScaleUp => Some(count),
        ScaleAction::ScaleDown => Some(-count),
        ScaleAction::None => None,
    }
}

/// One rule bound to its resolved collaborators: the metric source it
/// samples and the executor it scales through. Created once at startup
/// per configured rule and dispatched on every cron firing.
pub struct RuleEvaluation {
    pub job: String,
    pub group: String,
    pub min_count: i64,
    pub max_count: i64,
    pub rule: Rule,
    source: Arc<dyn MetricSource>,
    executor: Arc<ScalingExecutor>,
}

impl RuleEvaluation {
    pub fn new(
        job: String,
        group: String,
        min_count: i64,
        max_count: i64,
        rule: Rule,
        source: Arc<dyn MetricSource>,
        executor: Arc<ScalingExecutor>,
    ) -> Self {
        Self {
            job,
            group,
            min_count,
            max_count,
            rule,
            source,
            executor,
        }
    }

    /// `job/group/rule`, unique per configured rule.
    pub fn fingerprint(&self) -> String {
        format!("{}/{}/{}", self.job, self.group, self.rule.name)
    }

    /// Run one evaluation tick.
    ///
    /// Errors are logged and swallowed: a failed tick never stops the
    /// scheduler, and the next firing is the retry.
    pub async fn run(&self) {
        let fingerprint = self.fingerprint();

        let value = match self.source.current_value(&self.rule).await {
            Ok(v) => v,
            Err(e) if e.is_no_data() => {
                info!(rule = %fingerprint, "no datapoints this tick; skipping");
                return;
            }
            Err(e) => {
                error!(rule = %fingerprint, error = %e, "metric query failed");
                return;
            }
        };

        let Some(delta) = classify(&self.rule.policy, value) else {
            debug!(rule = %fingerprint, value, "value in band; nothing to do");
            return;
        };

        info!(
            rule = %fingerprint,
            value,
            delta,
            "threshold crossed; applying scale"
        );

        match self
            .executor
            .apply_scale(&self.job, &self.group, delta, self.min_count, self.max_count)
            .await
        {
            Ok(outcome) => match &outcome.eval_id {
                Some(eval) => {
                    info!(
                        rule = %fingerprint,
                        new_count = outcome.new_count,
                        eval = %eval,
                        "rule evaluation applied"
                    );
                }
                None => {
                    debug!(
                        rule = %fingerprint,
                        count = outcome.new_count,
                        decision = outcome.decision.label(),
                        "rule evaluation left count unchanged"
                    );
                }
            },
            Err(e) => {
                error!(rule = %fingerprint, error = %e, "scale failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use libra_backend::{MetricError, MetricSource};
    use libra_core::Rule;
    use libra_nomad::{NomadError, Scheduler, ScalingExecutor};

    use super::*;

    fn policy(
        min_threshold: f64,
        max_threshold: f64,
        min_action: ScaleAction,
        max_action: ScaleAction,
        min_action_count: i64,
        max_action_count: i64,
    ) -> ThresholdPolicy {
        ThresholdPolicy {
            min_threshold,
            max_threshold,
            min_action,
            max_action,
            min_action_count,
            max_action_count,
        }
    }

    // -- classify ------------------------------------------------------

    #[test]
    fn value_above_max_threshold_scales_up() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        assert_eq!(classify(&p, 95.0), Some(2));
    }

    #[test]
    fn value_below_min_threshold_scales_down() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        assert_eq!(classify(&p, 5.0), Some(-1));
    }

    #[test]
    fn value_in_band_is_none() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        assert_eq!(classify(&p, 50.0), None);
    }

    #[test]
    fn threshold_equality_is_in_band() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        assert_eq!(classify(&p, 20.0), None);
        assert_eq!(classify(&p, 80.0), None);
    }

    #[test]
    fn disabled_side_is_none() {
        let p = policy(20.0, 80.0, ScaleAction::None, ScaleAction::ScaleUp, 1, 2);
        assert_eq!(classify(&p, 5.0), None);
        assert_eq!(classify(&p, 95.0), Some(2));
    }

    #[test]
    fn inverted_actions_are_honored() {
        // Operators may scale down on high values (e.g. queue drains).
        let p = policy(20.0, 80.0, ScaleAction::ScaleUp, ScaleAction::ScaleDown, 3, 2);
        assert_eq!(classify(&p, 5.0), Some(3));
        assert_eq!(classify(&p, 95.0), Some(-2));
    }

    // -- RuleEvaluation::run ---------------------------------------------

    struct FixedSource(Result<f64, fn(String) -> MetricError>);

    #[async_trait]
    impl MetricSource for FixedSource {
        async fn current_value(&self, rule: &Rule) -> Result<f64, MetricError> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(make) => Err(make(rule.metric_name.clone())),
            }
        }
    }

    struct MemScheduler {
        count: tokio::sync::Mutex<i64>,
        writes: AtomicU64,
    }

    #[async_trait]
    impl Scheduler for MemScheduler {
        async fn group_count(&self, _job: &str, _group: &str) -> Result<i64, NomadError> {
            Ok(*self.count.lock().await)
        }

        async fn set_group_count(
            &self,
            _job: &str,
            _group: &str,
            count: i64,
        ) -> Result<String, NomadError> {
            *self.count.lock().await = count;
            let id = self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(format!("eval-{id}"))
        }

        async fn restart_task(
            &self,
            _job: &str,
            _group: &str,
            _task: &str,
            _image: &str,
        ) -> Result<String, NomadError> {
            unimplemented!("not exercised by evaluator tests")
        }
    }

    fn evaluation(
        current: i64,
        min_count: i64,
        max_count: i64,
        source: FixedSource,
        p: ThresholdPolicy,
    ) -> (RuleEvaluation, Arc<MemScheduler>) {
        let scheduler = Arc::new(MemScheduler {
            count: tokio::sync::Mutex::new(current),
            writes: AtomicU64::new(0),
        });
        let executor = Arc::new(ScalingExecutor::new(scheduler.clone()));
        let rule = Rule {
            name: "cpu-high".to_string(),
            backend: "test".to_string(),
            period: "* * * * *".to_string(),
            metric_name: "servers.api.cpu".to_string(),
            policy: p,
        };
        let eval = RuleEvaluation::new(
            "api".to_string(),
            "web".to_string(),
            min_count,
            max_count,
            rule,
            Arc::new(source),
            executor,
        );
        (eval, scheduler)
    }

    #[tokio::test]
    async fn high_value_scales_group_up() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        let (eval, scheduler) = evaluation(5, 2, 10, FixedSource(Ok(95.0)), p);

        eval.run().await;

        assert_eq!(*scheduler.count.lock().await, 7);
        assert_eq!(scheduler.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn in_band_value_issues_no_write() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        let (eval, scheduler) = evaluation(5, 2, 10, FixedSource(Ok(50.0)), p);

        eval.run().await;

        assert_eq!(*scheduler.count.lock().await, 5);
        assert_eq!(scheduler.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_min_action_issues_no_write() {
        let p = policy(20.0, 80.0, ScaleAction::None, ScaleAction::ScaleUp, 1, 2);
        let (eval, scheduler) = evaluation(5, 2, 10, FixedSource(Ok(5.0)), p);

        eval.run().await;

        assert_eq!(scheduler.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_data_skips_the_tick() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 2);
        let (eval, scheduler) = evaluation(5, 2, 10, FixedSource(Err(MetricError::NoData)), p);

        eval.run().await;

        assert_eq!(scheduler.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clamp_at_max_issues_no_write() {
        let p = policy(20.0, 80.0, ScaleAction::ScaleDown, ScaleAction::ScaleUp, 1, 3);
        let (eval, scheduler) = evaluation(6, 2, 6, FixedSource(Ok(95.0)), p);

        eval.run().await;

        assert_eq!(*scheduler.count.lock().await, 6);
        assert_eq!(scheduler.writes.load(Ordering::SeqCst), 0);
    }
}
