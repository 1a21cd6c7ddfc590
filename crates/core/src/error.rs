use thiserror::Error;

/// Errors raised while loading or validating the configuration directory.
///
/// Every variant is fatal at startup: the control plane refuses to run
/// with a config it cannot fully resolve.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("duplicate {kind} '{name}' defined in more than one config file")]
    Duplicate { kind: &'static str, name: String },

    #[error("missing backend kind for '{0}'")]
    MissingKind(String),

    #[error("{0}")]
    Validation(String),

    #[error("unknown backend '{backend}' referenced by rule {job}/{group}/{rule}")]
    UnknownBackend {
        backend: String,
        job: String,
        group: String,
        rule: String,
    },
}
