//! Common types used across the application

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::shared::errors::OptimizerError;

/// Pool identifier as it appears in the catalog and in balance files
pub type PoolId = String;

/// Risk strategy selecting the penalty table and yield weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskProfile {
    #[default]
    Stable,
    HighYield,
}

/// How raw pool figures are turned into an objective coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldWeighting {
    /// Pool size relative to the deepest pool
    Liquidity,
    /// Base annual percentage yield
    Apy,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 2] = [RiskProfile::Stable, RiskProfile::HighYield];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Stable => "stable",
            RiskProfile::HighYield => "high-yield",
        }
    }

    pub fn weighting(&self) -> YieldWeighting {
        match self {
            RiskProfile::Stable => YieldWeighting::Liquidity,
            RiskProfile::HighYield => YieldWeighting::Apy,
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stable" => Ok(RiskProfile::Stable),
            "high-yield" | "high_yield" | "highyield" => Ok(RiskProfile::HighYield),
            other => Err(format!("unknown risk profile '{}' (expected stable or high-yield)", other)),
        }
    }
}

/// Capital currently held per pool, in a stable numeraire (USD-equivalent)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapitalSnapshot(BTreeMap<PoolId, f64>);

impl CapitalSnapshot {
    pub fn new(balances: BTreeMap<PoolId, f64>) -> Self {
        Self(balances)
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<PoolId>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Parse a balances document: an object mapping pool id to a number or a
    /// numeric string.
    pub fn from_json(value: &Value) -> Result<Self, OptimizerError> {
        let object = value.as_object().ok_or_else(|| {
            OptimizerError::InvalidInput(format!("balances must be a JSON object, got {}", value))
        })?;

        let mut balances = BTreeMap::new();
        for (pool, raw) in object {
            let amount = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                OptimizerError::InvalidInput(format!("capital for pool '{}' is not numeric: {}", pool, raw))
            })?;
            balances.insert(pool.clone(), amount);
        }

        Ok(Self(balances))
    }

    pub fn get(&self, pool: &str) -> Option<f64> {
        self.0.get(pool).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolId, f64)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn as_map(&self) -> &BTreeMap<PoolId, f64> {
        &self.0
    }

    /// Reject NaN, infinite and negative amounts
    pub fn validate(&self) -> Result<(), OptimizerError> {
        for (pool, amount) in self.iter() {
            if !amount.is_finite() {
                return Err(OptimizerError::InvalidInput(format!(
                    "capital for pool '{}' is not a finite number",
                    pool
                )));
            }
            if amount < 0.0 {
                return Err(OptimizerError::InvalidInput(format!(
                    "capital for pool '{}' is negative: {}",
                    pool, amount
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of one optimizer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub before: BTreeMap<PoolId, f64>,
    pub after: BTreeMap<PoolId, f64>,
    pub change: BTreeMap<PoolId, f64>,
    pub total_optimized_yield: f64,
}

impl AllocationResult {
    /// Target amount minus current amount for every pool in either side
    pub fn delta(&self, pool: &str) -> f64 {
        let after = self.after.get(pool).copied().unwrap_or(0.0);
        let before = self.before.get(pool).copied().unwrap_or(0.0);
        after - before
    }

    pub fn allocated_total(&self) -> f64 {
        self.after.values().sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Opaque pool-state blob compared by value between polls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolSnapshot(Value);

impl PoolSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for PoolSnapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
