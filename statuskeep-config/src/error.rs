use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config from {origin}")]
    Parse {
        origin: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: &'static str, value: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
