pub mod config;
pub mod error;
pub mod scale;

pub use config::{
    BackendSpec, GroupSpec, JobSpec, RootConfig, Rule, ScaleAction, ThresholdPolicy,
};
pub use error::ConfigError;
pub use scale::{scale, set_capacity, Decision};
