//! Configuration data model and directory loader.
//!
//! The config lives in a directory of YAML files (`LIBRA_CONFIG_DIR`).
//! All regular files are discovered recursively, parsed independently,
//! and merged at the top level, so operators can split backends and jobs
//! across files in any order. Job, group, and rule names are derived
//! from their map keys. The resulting [`RootConfig`] is immutable for
//! the lifetime of the process.

use std::env;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the configuration directory.
pub const CONFIG_DIR_ENV: &str = "LIBRA_CONFIG_DIR";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

pub fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default)]
    pub backends: IndexMap<String, BackendSpec>,
    #[serde(default)]
    pub jobs: IndexMap<String, JobSpec>,
}

/// Connection details for one metrics backend.
///
/// Which fields matter depends on `kind`: graphite uses host/username/
/// password, prometheus uses host, cloudwatch uses region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: IndexMap<String, GroupSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub name: String,
    pub min_count: i64,
    pub max_count: i64,
    #[serde(default)]
    pub rules: IndexMap<String, Rule>,
}

/// A periodic metric probe bound to a two-sided threshold policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    /// Name of the configured backend this rule queries.
    pub backend: String,
    /// Cron expression driving evaluation (5- or 6-field).
    pub period: String,
    #[serde(default)]
    pub metric_name: String,
    #[serde(flatten)]
    pub policy: ThresholdPolicy,
}

/// Threshold band plus the action taken on each side of it.
///
/// Shared verbatim between config rules and webhook alert payloads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub min_threshold: f64,
    pub max_threshold: f64,
    #[serde(default)]
    pub min_action: ScaleAction,
    #[serde(default)]
    pub max_action: ScaleAction,
    #[serde(default)]
    pub min_action_count: i64,
    #[serde(default)]
    pub max_action_count: i64,
}

/// What to do when a threshold is crossed. `None` disables that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAction {
    ScaleUp,
    ScaleDown,
    #[default]
    None,
}

// ── Loading ───────────────────────────────────────────────────

impl RootConfig {
    /// Load and validate the configuration from a directory.
    ///
    /// Every regular, non-hidden file under `dir` is parsed as a YAML
    /// fragment of the root config; fragments merge at the top level.
    /// A name appearing in more than one file is an error rather than a
    /// silent override.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config directory '{}' not found", dir.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true);
            if entry.file_type().is_file() && !hidden {
                files.push(path.to_path_buf());
            }
        }
        files.sort();

        let mut merged = RootConfig::default();
        for file in &files {
            let contents = std::fs::read_to_string(file)?;
            if contents.trim().is_empty() {
                continue;
            }
            let fragment: RootConfig =
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: file.display().to_string(),
                    source,
                })?;
            merged.merge(fragment)?;
            tracing::debug!(file = %file.display(), "loaded config fragment");
        }

        merged.backfill_names();
        merged.validate()?;
        Ok(merged)
    }

    fn merge(&mut self, fragment: RootConfig) -> Result<(), ConfigError> {
        for (name, spec) in fragment.backends {
            if self.backends.contains_key(&name) {
                return Err(ConfigError::Duplicate {
                    kind: "backend",
                    name,
                });
            }
            self.backends.insert(name, spec);
        }
        for (name, job) in fragment.jobs {
            if self.jobs.contains_key(&name) {
                return Err(ConfigError::Duplicate { kind: "job", name });
            }
            self.jobs.insert(name, job);
        }
        Ok(())
    }

    /// Copy map keys into the `name` fields of backends, jobs, groups,
    /// and rules.
    fn backfill_names(&mut self) {
        for (name, backend) in &mut self.backends {
            backend.name = name.clone();
        }
        for (job_name, job) in &mut self.jobs {
            job.name = job_name.clone();
            for (group_name, group) in &mut job.groups {
                group.name = group_name.clone();
                for (rule_name, rule) in &mut group.rules {
                    rule.name = rule_name.clone();
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, backend) in &self.backends {
            if backend.kind.is_empty() {
                return Err(ConfigError::MissingKind(name.clone()));
            }
        }

        for (job_name, job) in &self.jobs {
            for (group_name, group) in &job.groups {
                if group.min_count < 0 {
                    return Err(ConfigError::Validation(format!(
                        "group {}/{}: min_count must be >= 0 (got {})",
                        job_name, group_name, group.min_count
                    )));
                }
                if group.max_count < group.min_count {
                    return Err(ConfigError::Validation(format!(
                        "group {}/{}: max_count {} is below min_count {}",
                        job_name, group_name, group.max_count, group.min_count
                    )));
                }

                for (rule_name, rule) in &group.rules {
                    if rule.backend.is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "rule {}/{}/{}: backend must be set",
                            job_name, group_name, rule_name
                        )));
                    }
                    if rule.period.is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "rule {}/{}/{}: period must be set",
                            job_name, group_name, rule_name
                        )));
                    }
                    if rule.policy.min_threshold > rule.policy.max_threshold {
                        return Err(ConfigError::Validation(format!(
                            "rule {}/{}/{}: min_threshold {} exceeds max_threshold {}",
                            job_name,
                            group_name,
                            rule_name,
                            rule.policy.min_threshold,
                            rule.policy.max_threshold
                        )));
                    }
                    if rule.policy.min_action_count < 0 || rule.policy.max_action_count < 0 {
                        return Err(ConfigError::Validation(format!(
                            "rule {}/{}/{}: action counts must be >= 0",
                            job_name, group_name, rule_name
                        )));
                    }
                    if !self.backends.contains_key(&rule.backend) {
                        return Err(ConfigError::UnknownBackend {
                            backend: rule.backend.clone(),
                            job: job_name.clone(),
                            group: group_name.clone(),
                            rule: rule_name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Look up a group spec by job and group name.
    pub fn group(&self, job: &str, group: &str) -> Option<&GroupSpec> {
        self.jobs.get(job).and_then(|j| j.groups.get(group))
    }

    /// Total number of rules across all jobs and groups.
    pub fn rule_count(&self) -> usize {
        self.jobs
            .values()
            .flat_map(|j| j.groups.values())
            .map(|g| g.rules.len())
            .sum()
    }
}
