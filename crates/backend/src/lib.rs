//! Metric backends for rule evaluation.
//!
//! This crate provides:
//! - The [`MetricSource`] capability: one scalar per rule query
//! - Graphite, Prometheus, and CloudWatch implementations
//! - The startup registry turning config specs into live sources

pub mod cloudwatch;
pub mod graphite;
pub mod prometheus;
pub mod registry;
pub mod traits;

pub use registry::{initialize_backends, BackendError, BackendKind, ConfiguredBackend, ConfiguredBackends};
pub use traits::{MetricError, MetricSource};
