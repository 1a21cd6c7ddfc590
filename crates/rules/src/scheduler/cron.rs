//! Cron normalization and due-check helpers.

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for
/// seconds.
///
/// The `cron` crate expects 6 fields (`sec min hour dom month dow`);
/// rule periods use standard 5-field cron.
pub(crate) fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Whether a schedule is due at `now`.
///
/// Due means a scheduled tick exists after `last_fired` (or within the
/// past day when the rule has never fired) and at or before `now`.
pub(crate) fn is_cron_due(
    schedule: &Schedule,
    now: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
) -> bool {
    let check_from = last_fired.unwrap_or(now - chrono::Duration::days(1));
    match schedule.after(&check_from).next() {
        Some(next) => next <= now,
        None => false,
    }
}
