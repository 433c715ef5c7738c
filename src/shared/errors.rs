//! Error handling for the application

use std::path::PathBuf;
use thiserror::Error;

use crate::shared::types::RiskProfile;

/// Optimizer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Solver failed for profile {profile} over pools {pools:?}: {reason}")]
    Solver {
        profile: RiskProfile,
        pools: Vec<String>,
        reason: String,
    },
}

/// Pool/balance data source errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Malformed data in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

/// Secret store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret backend error: {0}")]
    Backend(String),
}

/// Downstream action errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Credential unavailable: {0}")]
    Credential(#[from] SecretError),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Plan rejected: {0}")]
    Rejected(String),
}

/// Monitoring control errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("Invalid monitoring time: {0}")]
    InvalidParameter(String),

    #[error("Monitoring already in progress")]
    AlreadyRunning,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
