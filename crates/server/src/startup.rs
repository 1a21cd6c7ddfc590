//! Startup wiring: resolve each configured rule against its backend and
//! register it with the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use libra_backend::ConfiguredBackends;
use libra_core::RootConfig;
use libra_nomad::ScalingExecutor;
use libra_rules::{RuleEvaluation, RuleScheduler};

/// Everything the rule runner needs: schedule state plus the evaluation
/// task for each fingerprint.
pub struct ScheduleSet {
    pub scheduler: RuleScheduler,
    pub evaluations: HashMap<String, Arc<RuleEvaluation>>,
}

/// Walk jobs → groups → rules, binding each rule to its metric source
/// and registering its period. Any unresolvable rule or bad cron
/// expression aborts startup.
pub fn build_schedule(
    config: &RootConfig,
    backends: &ConfiguredBackends,
    executor: Arc<ScalingExecutor>,
) -> anyhow::Result<ScheduleSet> {
    info!("found {} backends", backends.len());
    for (name, backend) in backends {
        info!("  -> {} ({})", name, backend.kind);
    }
    info!("found {} jobs", config.jobs.len());

    let mut scheduler = RuleScheduler::new();
    let mut evaluations = HashMap::new();

    for job in config.jobs.values() {
        info!("  -> job: {}", job.name);

        for group in job.groups.values() {
            info!(
                "  --> group: {} (min_count={}, max_count={})",
                group.name, group.min_count, group.max_count
            );

            for rule in group.rules.values() {
                let backend = backends.get(&rule.backend).with_context(|| {
                    format!(
                        "rule {}/{}/{} references unknown backend '{}'",
                        job.name, group.name, rule.name, rule.backend
                    )
                })?;

                let evaluation = Arc::new(RuleEvaluation::new(
                    job.name.clone(),
                    group.name.clone(),
                    group.min_count,
                    group.max_count,
                    rule.clone(),
                    backend.source.clone(),
                    executor.clone(),
                ));
                let fingerprint = evaluation.fingerprint();

                scheduler
                    .register(&fingerprint, &rule.period)
                    .with_context(|| format!("failed to schedule rule {fingerprint}"))?;
                evaluations.insert(fingerprint, evaluation);

                info!("  ----> rule: {} (period: {})", rule.name, rule.period);
            }
        }
    }

    Ok(ScheduleSet {
        scheduler,
        evaluations,
    })
}
