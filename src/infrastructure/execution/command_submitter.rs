//! Submits plans through an external signer program
//!
//! The plan is written to the program's stdin as JSON and the signing key is
//! passed in `POOLWATCH_SIGNING_KEY`. The trimmed stdout is taken as the
//! transaction reference.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::domain::execution::{RebalancePlan, SecretValue, TransactionSubmitter};
use crate::shared::errors::ActionError;

pub const SIGNING_KEY_ENV: &str = "POOLWATCH_SIGNING_KEY";

#[derive(Debug, Clone)]
pub struct CommandSubmitter {
    program: String,
    args: Vec<String>,
}

impl CommandSubmitter {
    /// `command` is the program followed by its arguments
    pub fn new(command: &[String]) -> Result<Self, ActionError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ActionError::Rejected("submit command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl TransactionSubmitter for CommandSubmitter {
    async fn submit(&self, key: &SecretValue, plan: &RebalancePlan) -> Result<String, ActionError> {
        let payload = serde_json::to_vec(plan).map_err(|e| ActionError::Rejected(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(SIGNING_KEY_ENV, key.expose())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ActionError::Submission(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| ActionError::Submission(format!("failed to write plan: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ActionError::Submission(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ActionError::Submission(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let reference = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(plan_id = %plan.id, reference = %reference, "signer returned");
        Ok(reference)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use chrono::Utc;

    fn plan() -> RebalancePlan {
        RebalancePlan {
            id: "plan-1".to_string(),
            created_at: Utc::now(),
            moves: Vec::new(),
        }
    }

    fn sh(script: &str) -> CommandSubmitter {
        CommandSubmitter::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_reference_comes_from_stdout() {
        let submitter = sh("cat > /dev/null; echo \"tx-$POOLWATCH_SIGNING_KEY\"");
        let reference = submitter.submit(&SecretValue::new("abc"), &plan()).await.unwrap();
        assert_eq!(reference, "tx-abc");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_submission_error() {
        let submitter = sh("cat > /dev/null; echo nope >&2; exit 3");
        let err = submitter.submit(&SecretValue::new("abc"), &plan()).await.unwrap_err();
        match err {
            ActionError::Submission(message) => assert!(message.contains("nope")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandSubmitter::new(&[]).is_err());
    }
}
