//! Fresh distribution of a lump sum across the catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::optimizer::Optimizer;
use crate::shared::errors::OptimizerError;
use crate::shared::types::{PoolId, RiskProfile};

/// Allocation of new capital that is not yet deployed anywhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub total_capital: f64,
    pub risk_profile: RiskProfile,
    pub allocations: BTreeMap<PoolId, f64>,
    pub total_optimized_yield: f64,
}

impl Optimizer {
    /// Same objective and per-pool cap as [`Optimizer::optimize`], but the
    /// global constraint is the capital itself with no slack.
    pub fn allocate(&self, total_capital: f64, profile: RiskProfile) -> Result<DistributionResult, OptimizerError> {
        if !total_capital.is_finite() || total_capital < 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "total capital must be a non-negative number, got {}",
                total_capital
            )));
        }

        let (allocations, total_optimized_yield) = self.solve_allocation(total_capital, total_capital, profile)?;

        Ok(DistributionResult {
            total_capital,
            risk_profile: profile,
            allocations,
            total_optimized_yield,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_fills_top_two_pools() {
        let optimizer = Optimizer::default();
        let result = optimizer.allocate(0.569851, RiskProfile::HighYield).unwrap();

        let half = 0.569851 / 2.0;
        assert!((result.allocations["USDC/USDM"] - half).abs() < 1e-9);
        assert!((result.allocations["USDC/MONEY"] - half).abs() < 1e-9);
        assert!(result.allocations["4pool"].abs() < 1e-9);
        let sum: f64 = result.allocations.values().sum();
        assert!(sum <= 0.569851 + 1e-9);
    }

    #[test]
    fn test_allocate_rejects_negative_capital() {
        let optimizer = Optimizer::default();
        assert!(matches!(
            optimizer.allocate(-3.0, RiskProfile::Stable),
            Err(OptimizerError::InvalidInput(_))
        ));
    }
}
