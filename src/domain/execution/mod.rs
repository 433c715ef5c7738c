//! Execution domain - acting on a recomputed allocation

mod rebalance_plan;

pub use rebalance_plan::{MoveDirection, PoolMove, RebalancePlan};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::errors::{ActionError, SecretError};
use crate::shared::types::AllocationResult;

/// What an action reports back after handling a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub plan_id: String,
    pub moves: usize,
    pub submitted: bool,
    /// Transaction hash or other external reference, when one exists
    pub reference: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Performs the external effect of a reallocation
#[async_trait]
pub trait AllocationAction: Send + Sync {
    async fn execute(&self, result: &AllocationResult) -> Result<ActionReceipt, ActionError>;
}

/// Secret value that never prints itself
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// Credential lookup by identifier
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch_secret(&self, id: &str) -> Result<SecretValue, SecretError>;
}

/// Hands a signed plan to the chain. Returns an external reference.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, key: &SecretValue, plan: &RebalancePlan) -> Result<String, ActionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretValue::new("0xdeadbeef");
        assert_eq!(format!("{:?}", secret), "SecretValue(***)");
        assert_eq!(secret.expose(), "0xdeadbeef");
    }
}
