//! Credentialed reallocation: fetch the signing key, build the plan, submit

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::execution::{
    ActionReceipt, AllocationAction, MoveDirection, RebalancePlan, SecretStore, TransactionSubmitter,
};
use crate::shared::errors::ActionError;
use crate::shared::types::AllocationResult;
use crate::shared::utils::format_amount;

pub struct WithdrawalAction {
    secrets: Arc<dyn SecretStore>,
    submitter: Arc<dyn TransactionSubmitter>,
    secret_id: String,
    min_move: f64,
}

impl WithdrawalAction {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        submitter: Arc<dyn TransactionSubmitter>,
        secret_id: impl Into<String>,
        min_move: f64,
    ) -> Self {
        Self {
            secrets,
            submitter,
            secret_id: secret_id.into(),
            min_move,
        }
    }
}

#[async_trait]
impl AllocationAction for WithdrawalAction {
    async fn execute(&self, result: &AllocationResult) -> Result<ActionReceipt, ActionError> {
        let plan = RebalancePlan::from_result(result, self.min_move);
        if plan.is_empty() {
            info!(plan_id = %plan.id, "Allocation already balanced, nothing to submit");
            return Ok(ActionReceipt {
                plan_id: plan.id,
                moves: 0,
                submitted: false,
                reference: None,
                completed_at: Utc::now(),
            });
        }

        let key = self.secrets.fetch_secret(&self.secret_id).await.map_err(|e| {
            warn!(secret_id = %self.secret_id, "⚠️ Signing key unavailable: {}", e);
            ActionError::from(e)
        })?;

        info!(
            plan_id = %plan.id,
            withdraw = %format_amount(plan.total(MoveDirection::Withdraw)),
            deposit = %format_amount(plan.total(MoveDirection::Deposit)),
            "🚀 Submitting reallocation"
        );
        let reference = self.submitter.submit(&key, &plan).await?;

        Ok(ActionReceipt {
            plan_id: plan.id,
            moves: plan.moves.len(),
            submitted: true,
            reference: Some(reference),
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::SecretValue;
    use crate::shared::errors::SecretError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FixedSecrets(Option<&'static str>);

    #[async_trait]
    impl SecretStore for FixedSecrets {
        async fn fetch_secret(&self, id: &str) -> Result<SecretValue, SecretError> {
            self.0
                .map(SecretValue::new)
                .ok_or_else(|| SecretError::NotFound(id.to_string()))
        }
    }

    #[derive(Default)]
    struct CapturingSubmitter {
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl TransactionSubmitter for CapturingSubmitter {
        async fn submit(&self, key: &SecretValue, plan: &RebalancePlan) -> Result<String, ActionError> {
            self.seen
                .lock()
                .unwrap()
                .push((key.expose().to_string(), plan.moves.len()));
            Ok("0xfeed".to_string())
        }
    }

    fn result(after_a: f64) -> AllocationResult {
        AllocationResult {
            before: BTreeMap::from([("a".to_string(), 4.0)]),
            after: BTreeMap::from([("a".to_string(), after_a), ("b".to_string(), 4.0 - after_a)]),
            change: BTreeMap::from([("a".to_string(), after_a - 4.0)]),
            total_optimized_yield: 0.0,
        }
    }

    #[tokio::test]
    async fn test_submits_with_fetched_key() {
        let submitter = Arc::new(CapturingSubmitter::default());
        let action = WithdrawalAction::new(Arc::new(FixedSecrets(Some("pk"))), submitter.clone(), "signer", 1e-6);

        let receipt = action.execute(&result(1.0)).await.unwrap();
        assert!(receipt.submitted);
        assert_eq!(receipt.reference.as_deref(), Some("0xfeed"));
        assert_eq!(submitter.seen.lock().unwrap().as_slice(), &[("pk".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_missing_key_is_action_error() {
        let submitter = Arc::new(CapturingSubmitter::default());
        let action = WithdrawalAction::new(Arc::new(FixedSecrets(None)), submitter.clone(), "signer", 1e-6);

        let err = action.execute(&result(1.0)).await.unwrap_err();
        assert!(matches!(err, ActionError::Credential(SecretError::NotFound(_))));
        assert!(submitter.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balanced_plan_skips_key_lookup() {
        let submitter = Arc::new(CapturingSubmitter::default());
        let action = WithdrawalAction::new(Arc::new(FixedSecrets(None)), submitter.clone(), "signer", 1e-6);

        let mut balanced = result(4.0);
        balanced.after.remove("b");
        let receipt = action.execute(&balanced).await.unwrap();
        assert!(!receipt.submitted);
        assert_eq!(receipt.moves, 0);
    }
}
