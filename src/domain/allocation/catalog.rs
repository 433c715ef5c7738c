//! Static pool catalog

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::shared::errors::OptimizerError;
use crate::shared::types::{PoolId, RiskProfile};

/// Static description of one pool the optimizer may allocate into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub id: PoolId,
    /// Base annual percentage yield as a fraction (0.0317 = 3.17%)
    pub base_apy: f64,
    /// Total value locked
    pub tvl: f64,
    pub stable_penalty: f64,
    pub high_yield_penalty: f64,
}

impl PoolSpec {
    pub fn new(id: impl Into<PoolId>, base_apy: f64, tvl: f64, stable_penalty: f64, high_yield_penalty: f64) -> Self {
        Self {
            id: id.into(),
            base_apy,
            tvl,
            stable_penalty,
            high_yield_penalty,
        }
    }

    pub fn penalty(&self, profile: RiskProfile) -> f64 {
        match profile {
            RiskProfile::Stable => self.stable_penalty,
            RiskProfile::HighYield => self.high_yield_penalty,
        }
    }

    fn validate(&self) -> Result<(), OptimizerError> {
        if self.id.trim().is_empty() {
            return Err(OptimizerError::InvalidInput("pool id must not be empty".to_string()));
        }
        if !self.base_apy.is_finite() || self.base_apy < 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "pool '{}' has invalid base APY {}",
                self.id, self.base_apy
            )));
        }
        if !self.tvl.is_finite() || self.tvl < 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "pool '{}' has invalid TVL {}",
                self.id, self.tvl
            )));
        }
        for profile in RiskProfile::ALL {
            let penalty = self.penalty(profile);
            if !(0.0..1.0).contains(&penalty) {
                return Err(OptimizerError::InvalidInput(format!(
                    "pool '{}' has {} penalty {} outside [0, 1)",
                    self.id, profile, penalty
                )));
            }
        }
        Ok(())
    }
}

/// Ordered set of pools known to the optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCatalog {
    pools: Vec<PoolSpec>,
}

impl PoolCatalog {
    /// Validates every entry. An empty catalog is accepted here and rejected
    /// when optimizing.
    pub fn new(pools: Vec<PoolSpec>) -> Result<Self, OptimizerError> {
        let mut seen = HashSet::new();
        for pool in &pools {
            pool.validate()?;
            if !seen.insert(pool.id.as_str()) {
                return Err(OptimizerError::InvalidInput(format!("duplicate pool id '{}'", pool.id)));
            }
        }
        Ok(Self { pools })
    }

    /// Curve stablecoin pools the rebalancer was built around
    pub fn curve_stables() -> Self {
        Self {
            pools: vec![
                PoolSpec::new("4pool", 0.0027, 1_677_000.0, 0.01, 0.0),
                PoolSpec::new("USDC/USDM", 0.0317, 79_255.0, 0.05, 0.02),
                PoolSpec::new("USDC/MONEY", 0.0035, 2_259.0, 0.07, 0.03),
            ],
        }
    }

    pub fn pools(&self) -> &[PoolSpec] {
        &self.pools
    }

    pub fn ids(&self) -> Vec<PoolId> {
        self.pools.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn max_tvl(&self) -> f64 {
        self.pools.iter().map(|p| p.tvl).fold(0.0, f64::max)
    }
}

impl Default for PoolCatalog {
    fn default() -> Self {
        Self::curve_stables()
    }
}
