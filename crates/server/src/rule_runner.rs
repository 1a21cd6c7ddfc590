//! Background rule evaluation loop.
//!
//! Ticks once a second, dispatches due rules fire-and-forget, and never
//! waits for a previous tick of the same rule: overlapping evaluations
//! are safe because the executor serializes writes per task group.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::startup::ScheduleSet;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Run the evaluation loop until `shutdown` flips.
///
/// Each due rule is spawned onto the runtime after a uniform random
/// delay in `[0, jitter)`, decorrelating rules that share a period.
/// On shutdown, in-flight evaluations get `grace` to finish.
pub async fn run_rule_loop(
    mut schedule: ScheduleSet,
    jitter: Duration,
    grace: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(rules = schedule.scheduler.len(), "rule runner active");

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut in_flight = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        // Reap finished evaluations so the set doesn't grow unbounded.
        while in_flight.try_join_next().is_some() {}

        let now = Utc::now();
        for fingerprint in schedule.scheduler.due_fingerprints(now) {
            let Some(evaluation) = schedule.evaluations.get(&fingerprint) else {
                continue;
            };
            schedule.scheduler.record_fired(&fingerprint, now);

            let evaluation = evaluation.clone();
            let delay = random_jitter(jitter);
            debug!(
                rule = %fingerprint,
                delay_ms = delay.as_millis() as u64,
                "dispatching rule evaluation"
            );
            in_flight.spawn(async move {
                tokio::time::sleep(delay).await;
                evaluation.run().await;
            });
        }
    }

    info!(
        grace_secs = grace.as_secs(),
        "rule runner stopping; draining in-flight evaluations"
    );
    let drain = async {
        while in_flight.join_next().await.is_some() {}
    };
    if tokio::time::timeout(grace, drain).await.is_err() {
        warn!("in-flight rule evaluations did not finish within the grace period");
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}
