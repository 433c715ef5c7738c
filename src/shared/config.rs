use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::allocation::{PoolCatalog, PoolSpec};
use crate::shared::errors::ConfigError;
use crate::shared::types::RiskProfile;

pub const DEFAULT_CONFIG_PATH: &str = "Config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub pool_data_path: PathBuf,
    pub balances_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            pool_data_path: PathBuf::from("pool_data.json"),
            balances_path: PathBuf::from("user_balance.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval_secs: u64,
    pub risk_profile: RiskProfile,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            risk_profile: RiskProfile::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub simulate_only: bool,
    pub secret_id: String,
    /// Moves smaller than this are not worth a transaction
    pub min_move_amount: f64,
    /// Signer program and arguments, required when not simulating
    pub submit_command: Vec<String>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            simulate_only: true,
            secret_id: "rebalance-signer".to_string(),
            min_move_amount: 1e-9,
            submit_command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Empty means the built-in Curve catalog
    pub pools: Vec<PoolSpec>,
}

/// Whole-application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub monitor: MonitorSettings,
    pub action: ActionConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn catalog(&self) -> Result<PoolCatalog, ConfigError> {
        if self.catalog.pools.is_empty() {
            return Ok(PoolCatalog::curve_stables());
        }
        PoolCatalog::new(self.catalog.pools.clone()).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Invalid("monitor.interval_secs must be positive".to_string()));
        }
        if !self.action.min_move_amount.is_finite() || self.action.min_move_amount < 0.0 {
            return Err(ConfigError::Invalid("action.min_move_amount must be non-negative".to_string()));
        }
        if !self.action.simulate_only && self.action.submit_command.is_empty() {
            return Err(ConfigError::Invalid(
                "action.submit_command is required when simulate_only is false".to_string(),
            ));
        }
        self.catalog().map(|_| ())
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// An explicit path must exist; otherwise `Config.toml` is used when
    /// present and defaults when not.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_from(DEFAULT_CONFIG_PATH),
            None => Ok(AppConfig::default()),
        }
    }
}
