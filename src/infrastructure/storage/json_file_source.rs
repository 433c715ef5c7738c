//! Flat-file pool/balance data source

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::monitoring::PoolDataSource;
use crate::shared::errors::DataSourceError;
use crate::shared::types::{CapitalSnapshot, PoolSnapshot};

/// Reads `pool_data.json` and `user_balance.json` style files on every call
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pool_data_path: PathBuf,
    balances_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(pool_data_path: impl Into<PathBuf>, balances_path: impl Into<PathBuf>) -> Self {
        Self {
            pool_data_path: pool_data_path.into(),
            balances_path: balances_path.into(),
        }
    }

    async fn read_json(path: &Path) -> Result<Value, DataSourceError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| DataSourceError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| DataSourceError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PoolDataSource for JsonFileSource {
    async fn read_pool_snapshot(&self) -> Result<PoolSnapshot, DataSourceError> {
        let value = Self::read_json(&self.pool_data_path).await?;
        debug!(path = %self.pool_data_path.display(), "pool snapshot read");
        Ok(PoolSnapshot::new(value))
    }

    async fn read_balances(&self) -> Result<CapitalSnapshot, DataSourceError> {
        let value = Self::read_json(&self.balances_path).await?;
        CapitalSnapshot::from_json(&value).map_err(|e| DataSourceError::Malformed {
            path: self.balances_path.clone(),
            message: e.to_string(),
        })
    }
}
