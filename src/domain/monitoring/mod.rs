//! Monitoring domain - change-triggered reallocation

mod poll_state;
mod scheduler;

pub use poll_state::{MonitorPhase, PollState};
pub use scheduler::{Monitor, MonitorConfig, MonitorSession, MonitorStats, MonitorStatus};

use async_trait::async_trait;

use crate::shared::errors::DataSourceError;
use crate::shared::types::{CapitalSnapshot, PoolSnapshot};

/// Where pool state and current balances are read from. Reads are idempotent.
#[async_trait]
pub trait PoolDataSource: Send + Sync {
    async fn read_pool_snapshot(&self) -> Result<PoolSnapshot, DataSourceError>;

    async fn read_balances(&self) -> Result<CapitalSnapshot, DataSourceError>;
}
