//! Simulate-only action: logs the plan, moves nothing

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::domain::execution::{ActionReceipt, AllocationAction, RebalancePlan};
use crate::shared::errors::ActionError;
use crate::shared::types::AllocationResult;
use crate::shared::utils::format_amount;

#[derive(Debug, Clone)]
pub struct DryRunAction {
    min_move: f64,
}

impl DryRunAction {
    pub fn new(min_move: f64) -> Self {
        Self { min_move }
    }
}

#[async_trait]
impl AllocationAction for DryRunAction {
    async fn execute(&self, result: &AllocationResult) -> Result<ActionReceipt, ActionError> {
        let plan = RebalancePlan::from_result(result, self.min_move);
        info!(plan_id = %plan.id, moves = plan.moves.len(), "🧪 Simulation mode - not moving funds");
        for m in &plan.moves {
            info!("   {:?} {} from/to {}", m.direction, format_amount(m.amount), m.pool);
        }

        Ok(ActionReceipt {
            plan_id: plan.id,
            moves: plan.moves.len(),
            submitted: false,
            reference: None,
            completed_at: Utc::now(),
        })
    }
}
