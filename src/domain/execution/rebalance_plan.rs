//! Turning an allocation result into concrete fund movements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::shared::types::{AllocationResult, PoolId};
use crate::shared::utils::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Withdraw,
    Deposit,
}

/// Single fund movement against one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMove {
    pub pool: PoolId,
    pub direction: MoveDirection,
    pub amount: f64,
}

/// Ordered list of moves: withdrawals first, then deposits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub moves: Vec<PoolMove>,
}

impl RebalancePlan {
    /// Moves smaller than `min_move` are dropped as dust. Deposits are
    /// scaled down so they never spend more than the plan withdraws.
    pub fn from_result(result: &AllocationResult, min_move: f64) -> Self {
        let pools: BTreeSet<&PoolId> = result.before.keys().chain(result.after.keys()).collect();

        let mut withdrawals = Vec::new();
        let mut deposits = Vec::new();
        for pool in pools {
            let delta = result.delta(pool);
            if delta.abs() < min_move || delta == 0.0 {
                continue;
            }
            let (direction, bucket) = if delta < 0.0 {
                (MoveDirection::Withdraw, &mut withdrawals)
            } else {
                (MoveDirection::Deposit, &mut deposits)
            };
            bucket.push(PoolMove {
                pool: pool.clone(),
                direction,
                amount: delta.abs(),
            });
        }

        let withdrawn: f64 = withdrawals.iter().map(|m: &PoolMove| m.amount).sum();
        let deposited: f64 = deposits.iter().map(|m: &PoolMove| m.amount).sum();
        if deposited > withdrawn {
            let scale = withdrawn / deposited;
            debug!(withdrawn, deposited, scale, "Scaling deposits down to the withdrawn amount");
            for deposit in &mut deposits {
                deposit.amount *= scale;
            }
            deposits.retain(|m| m.amount >= min_move && m.amount > 0.0);
        }
        withdrawals.extend(deposits);

        Self {
            id: generate_id(),
            created_at: Utc::now(),
            moves: withdrawals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn total(&self, direction: MoveDirection) -> f64 {
        self.moves
            .iter()
            .filter(|m| m.direction == direction)
            .map(|m| m.amount)
            .sum()
    }
}
