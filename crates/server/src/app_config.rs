//! Process-level server settings, read from the environment.

use std::time::Duration;

use libra_core::config::{env_or, env_u16, env_u64};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for every outbound metric and scheduler call.
    pub http_timeout: Duration,
    /// Upper bound of the random delay before each rule evaluation.
    pub eval_jitter: Duration,
    /// How long in-flight evaluations may finish after shutdown.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("LIBRA_HOST", "0.0.0.0"),
            port: env_u16("LIBRA_PORT", 8646),
            http_timeout: Duration::from_secs(env_u64("LIBRA_HTTP_TIMEOUT_SECS", 30)),
            eval_jitter: Duration::from_secs(env_u64("LIBRA_EVAL_JITTER_SECS", 10)),
            shutdown_grace: Duration::from_secs(env_u64("LIBRA_SHUTDOWN_GRACE_SECS", 30)),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8646,
            http_timeout: Duration::from_secs(30),
            eval_jitter: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8646");
    }
}
