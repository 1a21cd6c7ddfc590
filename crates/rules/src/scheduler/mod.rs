//! Cron schedule state for configured rules.

mod core;
mod cron;
mod entry;

pub use self::core::RuleScheduler;
pub use self::entry::ScheduleEntry;

/// Errors raised while registering rule schedules. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("bad cron expression '{expr}' for rule {rule}: {source}")]
    BadCronExpression {
        rule: String,
        expr: String,
        #[source]
        source: ::cron::error::Error,
    },

    #[error("rule '{0}' is scheduled twice")]
    Duplicate(String),
}
