//! Per-rule schedule entry type.

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Scheduling state for a single rule.
///
/// The schedule is parsed once at registration; rules are immutable for
/// the process lifetime, so there is nothing to re-parse later.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// Rule fingerprint (`job/group/rule`).
    pub fingerprint: String,
    /// Cron expression as configured (before normalization).
    pub period: String,
    /// Parsed schedule driving the due check.
    pub schedule: Schedule,
    /// When this rule was last dispatched.
    pub last_fired: Option<DateTime<Utc>>,
}
