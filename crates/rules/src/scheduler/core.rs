//! [`RuleScheduler`] holds schedule state for all configured rules.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use super::cron::{is_cron_due, normalize_cron};
use super::entry::ScheduleEntry;
use super::ScheduleError;

/// Holds one schedule entry per rule fingerprint.
///
/// All rules register before the tick loop starts; registration is the
/// single place a bad cron expression can surface, and it aborts
/// startup. The tick loop calls [`due_fingerprints`](Self::due_fingerprints)
/// and stamps dispatched rules with [`record_fired`](Self::record_fired).
pub struct RuleScheduler {
    entries: HashMap<String, ScheduleEntry>,
}

impl RuleScheduler {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a rule's period under its fingerprint.
    ///
    /// 5-field expressions are normalized by prepending a seconds field.
    pub fn register(&mut self, fingerprint: &str, period: &str) -> Result<(), ScheduleError> {
        if self.entries.contains_key(fingerprint) {
            return Err(ScheduleError::Duplicate(fingerprint.to_string()));
        }

        let normalized = normalize_cron(period);
        let schedule =
            Schedule::from_str(&normalized).map_err(|source| ScheduleError::BadCronExpression {
                rule: fingerprint.to_string(),
                expr: period.to_string(),
                source,
            })?;

        self.entries.insert(
            fingerprint.to_string(),
            ScheduleEntry {
                fingerprint: fingerprint.to_string(),
                period: period.to_string(),
                schedule,
                last_fired: None,
            },
        );
        Ok(())
    }

    /// Whether a single rule is due at the given instant.
    pub fn is_due(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get(fingerprint) {
            Some(entry) => is_cron_due(&entry.schedule, now, entry.last_fired),
            None => false,
        }
    }

    /// Fingerprints of all rules due at the given instant.
    pub fn due_fingerprints(&self, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| is_cron_due(&e.schedule, now, e.last_fired))
            .map(|e| e.fingerprint.clone())
            .collect()
    }

    /// Record that a rule was dispatched at `at`.
    pub fn record_fired(&mut self, fingerprint: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(fingerprint) {
            entry.last_fired = Some(at);
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<&ScheduleEntry> {
        self.entries.get(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RuleScheduler {
    fn default() -> Self {
        Self::new()
    }
}
