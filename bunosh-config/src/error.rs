//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reasons a configuration cannot be used; every variant names what to fix
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid YAML: {source}", .path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `BUNOSH_*` variable holds an unusable value
    #[error("Environment variable error: {0}")]
    EnvError(String),

    #[error("Invalid {domain} configuration: {message}")]
    DomainError { domain: String, message: String },
}
