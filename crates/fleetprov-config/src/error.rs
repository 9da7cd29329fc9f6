use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    ConfigDirNotFound,

    #[error(
        "config file not found. Looked in:\n\
        - $FLEETPROV_CONFIG\n\
        - ./fleetprov.yaml\n\
        - ~/.config/fleetprov/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("storage pool not found: {0}")]
    PoolNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
