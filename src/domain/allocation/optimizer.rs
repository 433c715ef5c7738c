//! Risk-profile driven allocation optimizer

use std::collections::BTreeMap;
use tracing::{debug, error, warn};

use super::catalog::PoolCatalog;
use super::model::{LinearModel, ModelBuilder, RowOp, Sense, VarId};
use crate::shared::errors::OptimizerError;
use crate::shared::types::{AllocationResult, CapitalSnapshot, PoolId, RiskProfile, YieldWeighting};

/// Added to every effective yield so no pool has a zero coefficient
pub const YIELD_TIE_BREAKER: f64 = 0.0001;
/// Largest share of total capital a single pool may receive
pub const MAX_POOL_SHARE: f64 = 0.5;
/// Tolerance above total capital allowed in the global constraint
pub const CAPITAL_SLACK: f64 = 1.01;

const GLOBAL_CAP_ROW: &str = "total_allocation";

/// Per-pool contribution to the allocation model
#[derive(Debug, Clone, PartialEq)]
pub struct PoolTerm {
    pub pool: PoolId,
    pub objective: f64,
    pub in_global_cap: bool,
    pub bounds: (f64, f64),
}

/// Linear model plus the variable handle of each pool
#[derive(Debug, Clone)]
pub struct AllocationModel {
    pub model: LinearModel,
    pub variables: Vec<(PoolId, VarId)>,
}

impl AllocationModel {
    /// Assemble one variable per term and a single global cap row over the
    /// members of the cap.
    pub fn from_terms(terms: &[PoolTerm], global_cap: f64) -> Self {
        let mut builder = ModelBuilder::new("Net_Annual_Yield", Sense::Maximize);
        let mut variables = Vec::with_capacity(terms.len());
        let mut cap_terms = Vec::new();

        for term in terms {
            let var = builder.add_variable(format!("alloc_{}", term.pool), term.objective, term.bounds);
            if term.in_global_cap {
                cap_terms.push((var, 1.0));
            }
            variables.push((term.pool.clone(), var));
        }
        builder.add_row(GLOBAL_CAP_ROW, cap_terms, RowOp::Le, global_cap);

        Self {
            model: builder.build(),
            variables,
        }
    }
}

/// Effective yield per catalog pool under a profile
pub fn effective_yields(catalog: &PoolCatalog, profile: RiskProfile) -> Vec<(PoolId, f64)> {
    let max_tvl = catalog.max_tvl();
    catalog
        .pools()
        .iter()
        .map(|pool| {
            let keep = 1.0 - pool.penalty(profile);
            let weight = match profile.weighting() {
                YieldWeighting::Liquidity => pool.tvl / (max_tvl + 1.0),
                YieldWeighting::Apy => pool.base_apy,
            };
            (pool.id.clone(), weight * keep + YIELD_TIE_BREAKER)
        })
        .collect()
}

/// Solves the allocation LP against a fixed catalog
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    catalog: PoolCatalog,
}

impl Optimizer {
    pub fn new(catalog: PoolCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PoolCatalog {
        &self.catalog
    }

    /// Rebalance existing capital across the catalog.
    ///
    /// Pools missing from `capital` still receive a decision variable and count
    /// as holding nothing. `change` is keyed by the pools of `capital`.
    pub fn optimize(&self, capital: &CapitalSnapshot, profile: RiskProfile) -> Result<AllocationResult, OptimizerError> {
        capital.validate()?;

        let total_capital = capital.total();
        let (after, total_optimized_yield) = self.solve_allocation(total_capital, total_capital * CAPITAL_SLACK, profile)?;

        let before = capital.as_map().clone();
        let change = before
            .iter()
            .map(|(pool, held)| (pool.clone(), after.get(pool).copied().unwrap_or(0.0) - held))
            .collect();

        debug!(
            profile = %profile,
            total_capital,
            total_optimized_yield,
            "allocation optimized"
        );

        Ok(AllocationResult {
            before,
            after,
            change,
            total_optimized_yield,
        })
    }

    /// Build and solve the model. Returns per-pool allocations and the
    /// objective value they achieve.
    pub(crate) fn solve_allocation(
        &self,
        total_capital: f64,
        global_cap: f64,
        profile: RiskProfile,
    ) -> Result<(BTreeMap<PoolId, f64>, f64), OptimizerError> {
        if self.catalog.is_empty() {
            return Err(OptimizerError::InvalidInput("pool catalog is empty".to_string()));
        }

        let max_allocation = MAX_POOL_SHARE * total_capital;
        let yields = effective_yields(&self.catalog, profile);
        let terms: Vec<PoolTerm> = yields
            .iter()
            .map(|(pool, coeff)| PoolTerm {
                pool: pool.clone(),
                objective: *coeff,
                in_global_cap: true,
                bounds: (0.0, max_allocation),
            })
            .collect();

        let allocation = AllocationModel::from_terms(&terms, global_cap);
        let solution = allocation.model.solve().map_err(|failure| {
            error!(
                profile = %profile,
                model = %allocation.model,
                "❌ allocation solve failed: {}",
                failure
            );
            OptimizerError::Solver {
                profile,
                pools: self.catalog.ids(),
                reason: failure.to_string(),
            }
        })?;

        let mut after = BTreeMap::new();
        let mut total_yield = 0.0;
        for ((pool, var), (_, coeff)) in allocation.variables.iter().zip(&yields) {
            let amount = solution.value(*var).clamp(0.0, max_allocation);
            total_yield += coeff * amount;
            after.insert(pool.clone(), amount);
        }

        if (solution.objective() - total_yield).abs() > 1e-9 {
            warn!(
                solver_objective = solution.objective(),
                total_yield,
                "⚠️ clamping moved the allocation off the solver optimum"
            );
        }

        Ok((after, total_yield))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::catalog::PoolSpec;

    const EPS: f64 = 1e-9;

    fn sample_capital() -> CapitalSnapshot {
        CapitalSnapshot::from_pairs([
            ("4pool", 0.021533917069534242),
            ("USDC/USDM", 0.009702021716962433),
            ("USDC/MONEY", 0.0),
        ])
    }

    fn assert_bounds(result: &AllocationResult, total: f64) {
        for (pool, amount) in &result.after {
            assert!(*amount >= 0.0, "{} below zero", pool);
            assert!(*amount <= MAX_POOL_SHARE * total + EPS, "{} above cap", pool);
        }
        assert!(result.allocated_total() <= CAPITAL_SLACK * total + EPS);
    }

    #[test]
    fn test_effective_yields_match_profile_formulas() {
        let catalog = PoolCatalog::curve_stables();

        let stable: BTreeMap<_, _> = effective_yields(&catalog, RiskProfile::Stable).into_iter().collect();
        let expected = 1_677_000.0 / 1_677_001.0 * 0.99 + 0.0001;
        assert!((stable["4pool"] - expected).abs() < 1e-12);
        let expected = 79_255.0 / 1_677_001.0 * 0.95 + 0.0001;
        assert!((stable["USDC/USDM"] - expected).abs() < 1e-12);

        let high: BTreeMap<_, _> = effective_yields(&catalog, RiskProfile::HighYield).into_iter().collect();
        assert!((high["USDC/USDM"] - (0.0317 * 0.98 + 0.0001)).abs() < 1e-12);
        assert!((high["4pool"] - (0.0027 + 0.0001)).abs() < 1e-12);
    }

    #[test]
    fn test_stable_profile_sample() {
        let optimizer = Optimizer::default();
        let capital = sample_capital();
        let total = capital.total();
        let result = optimizer.optimize(&capital, RiskProfile::Stable).unwrap();

        assert_bounds(&result, total);
        let cap = MAX_POOL_SHARE * total;
        assert!((cap - 0.0156).abs() < 1e-4);

        let four = result.after["4pool"];
        assert!((four - cap).abs() < 1e-9);
        for amount in result.after.values() {
            assert!(four + EPS >= *amount);
        }
        // Remaining slack goes to the last pool once the top two are capped.
        assert!((result.after["USDC/USDM"] - cap).abs() < 1e-9);
        let rest = CAPITAL_SLACK * total - 2.0 * cap;
        assert!((result.after["USDC/MONEY"] - rest).abs() < 1e-9);
    }

    #[test]
    fn test_change_is_after_minus_before() {
        let optimizer = Optimizer::default();
        let capital = sample_capital();
        let result = optimizer.optimize(&capital, RiskProfile::HighYield).unwrap();

        assert_eq!(result.change.len(), capital.len());
        for (pool, held) in capital.iter() {
            assert!((result.change[pool] - (result.after[pool] - held)).abs() < 1e-15);
        }
        let objective: f64 = effective_yields(optimizer.catalog(), RiskProfile::HighYield)
            .iter()
            .map(|(p, c)| c * result.after[p])
            .sum();
        assert!((result.total_optimized_yield - objective).abs() < 1e-15);
    }

    #[test]
    fn test_high_yield_prefers_apy() {
        let optimizer = Optimizer::default();
        let capital = CapitalSnapshot::from_pairs([("4pool", 100.0), ("USDC/USDM", 0.0), ("USDC/MONEY", 0.0)]);
        let result = optimizer.optimize(&capital, RiskProfile::HighYield).unwrap();

        assert!((result.after["USDC/USDM"] - 50.0).abs() < 1e-9);
        assert!((result.after["USDC/MONEY"] - 50.0).abs() < 1e-9);
        assert!((result.after["4pool"] - 1.0).abs() < 1e-9);
        assert_bounds(&result, 100.0);
    }

    #[test]
    fn test_deterministic() {
        let optimizer = Optimizer::default();
        let capital = sample_capital();
        for profile in RiskProfile::ALL {
            let a = optimizer.optimize(&capital, profile).unwrap();
            let b = optimizer.optimize(&capital, profile).unwrap();
            assert_eq!(a.after, b.after);
            assert_eq!(a.total_optimized_yield, b.total_optimized_yield);
        }
    }

    #[test]
    fn test_lower_penalty_never_shrinks_allocation() {
        // Three pools between two caps, so the middle one is marginal.
        let pools = |penalty: f64| {
            PoolCatalog::new(vec![
                PoolSpec::new("a", 0.05, 100.0, 0.0, 0.0),
                PoolSpec::new("b", 0.04, 100.0, 0.0, penalty),
                PoolSpec::new("c", 0.03, 100.0, 0.0, 0.0),
            ])
            .unwrap()
        };
        let capital = CapitalSnapshot::from_pairs([("a", 10.0), ("b", 10.0), ("c", 10.0)]);

        let penalised = Optimizer::new(pools(0.5)).optimize(&capital, RiskProfile::HighYield).unwrap();
        let favoured = Optimizer::new(pools(0.0)).optimize(&capital, RiskProfile::HighYield).unwrap();

        assert!(favoured.after["b"] + EPS >= penalised.after["b"]);
        assert!(favoured.after["b"] > penalised.after["b"]);
    }

    #[test]
    fn test_pools_missing_from_capital_are_still_allocated() {
        let optimizer = Optimizer::default();
        let capital = CapitalSnapshot::from_pairs([("4pool", 10.0)]);
        let result = optimizer.optimize(&capital, RiskProfile::Stable).unwrap();

        assert_eq!(result.after.len(), 3);
        assert!(result.after["USDC/USDM"] > 0.0);
        assert_eq!(result.change.len(), 1);
        assert!((result.change["4pool"] - (5.0 - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capital_allocates_nothing() {
        let optimizer = Optimizer::default();
        let capital = CapitalSnapshot::from_pairs([("4pool", 0.0)]);
        let result = optimizer.optimize(&capital, RiskProfile::Stable).unwrap();
        assert!(result.after.values().all(|v| *v == 0.0));
        assert_eq!(result.total_optimized_yield, 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let optimizer = Optimizer::default();
        let negative = CapitalSnapshot::from_pairs([("4pool", -1.0)]);
        assert!(matches!(
            optimizer.optimize(&negative, RiskProfile::Stable),
            Err(OptimizerError::InvalidInput(_))
        ));

        let nan = CapitalSnapshot::from_pairs([("4pool", f64::NAN)]);
        assert!(matches!(
            optimizer.optimize(&nan, RiskProfile::Stable),
            Err(OptimizerError::InvalidInput(_))
        ));

        let empty = Optimizer::new(PoolCatalog::new(Vec::new()).unwrap());
        assert!(matches!(
            empty.optimize(&sample_capital(), RiskProfile::Stable),
            Err(OptimizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_model_shape() {
        let terms = vec![
            PoolTerm { pool: "x".into(), objective: 0.2, in_global_cap: true, bounds: (0.0, 5.0) },
            PoolTerm { pool: "y".into(), objective: 0.1, in_global_cap: false, bounds: (0.0, 5.0) },
        ];
        let allocation = AllocationModel::from_terms(&terms, 7.0);
        let row = allocation.model.row(GLOBAL_CAP_ROW).unwrap();
        assert_eq!(row.terms.len(), 1);
        assert_eq!(row.rhs, 7.0);
        assert_eq!(allocation.model.variable(allocation.variables[1].1).name, "alloc_y");
    }
}
