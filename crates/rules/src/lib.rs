//! Rule evaluation engine.
//!
//! This crate provides:
//! - Threshold classification mapping a sampled value onto a signed
//!   scale delta
//! - [`RuleEvaluation`], the per-rule task run on every cron firing
//! - [`RuleScheduler`], cron schedule state keyed by rule fingerprint

pub mod evaluator;
pub mod scheduler;

pub use evaluator::{classify, RuleEvaluation};
pub use scheduler::{RuleScheduler, ScheduleError};
