//! Application services and use cases

use std::path::Path;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

use crate::domain::allocation::{DistributionResult, Optimizer};
use crate::domain::execution::AllocationAction;
use crate::domain::monitoring::{Monitor, MonitorConfig, PoolDataSource};
use crate::infrastructure::{CommandSubmitter, DryRunAction, EnvSecretStore, JsonFileSource, WithdrawalAction};
use crate::shared::config::AppConfig;
use crate::shared::errors::AppError;
use crate::shared::types::{AllocationResult, RiskProfile};

/// Wires configuration into the optimizer, data source, action and monitor
pub struct PoolWatchService {
    config: AppConfig,
    optimizer: Arc<Optimizer>,
}

impl PoolWatchService {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let optimizer = Arc::new(Optimizer::new(config.catalog()?));
        Ok(Self {
            config: config.clone(),
            optimizer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &Arc<Optimizer> {
        &self.optimizer
    }

    pub fn data_source(&self) -> JsonFileSource {
        JsonFileSource::new(&self.config.data.pool_data_path, &self.config.data.balances_path)
    }

    pub fn action(&self) -> Result<Arc<dyn AllocationAction>, AppError> {
        let action = &self.config.action;
        if action.simulate_only {
            return Ok(Arc::new(DryRunAction::new(action.min_move_amount)));
        }

        let submitter = CommandSubmitter::new(&action.submit_command)?;
        Ok(Arc::new(WithdrawalAction::new(
            Arc::new(EnvSecretStore::default()),
            Arc::new(submitter),
            action.secret_id.clone(),
            action.min_move_amount,
        )))
    }

    pub fn monitor(&self, profile: Option<RiskProfile>, interval_secs: Option<u64>) -> Result<Monitor, AppError> {
        let config = MonitorConfig {
            interval: Duration::from_secs(interval_secs.unwrap_or(self.config.monitor.interval_secs).max(1)),
            risk_profile: profile.unwrap_or(self.config.monitor.risk_profile),
        };
        info!(
            pool_data = %self.config.data.pool_data_path.display(),
            balances = %self.config.data.balances_path.display(),
            simulate_only = self.config.action.simulate_only,
            "Monitor configured"
        );
        Ok(Monitor::new(
            config,
            Arc::clone(&self.optimizer),
            Arc::new(self.data_source()),
            self.action()?,
        ))
    }

    /// One-shot optimization of the configured (or given) balances file
    pub async fn optimize_balances(&self, balances: Option<&Path>, profile: RiskProfile) -> Result<AllocationResult, AppError> {
        let source = match balances {
            Some(path) => JsonFileSource::new(&self.config.data.pool_data_path, path),
            None => self.data_source(),
        };
        let capital = source.read_balances().await?;
        Ok(self.optimizer.optimize(&capital, profile)?)
    }

    pub fn allocate(&self, total_capital: f64, profile: RiskProfile) -> Result<DistributionResult, AppError> {
        Ok(self.optimizer.allocate(total_capital, profile)?)
    }
}
