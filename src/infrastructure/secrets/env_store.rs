//! Environment-backed secret store

use async_trait::async_trait;

use crate::domain::execution::{SecretStore, SecretValue};
use crate::shared::errors::SecretError;

/// Resolves `rebalance-signer` to `POOLWATCH_SECRET_REBALANCE_SIGNER`
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new("POOLWATCH_SECRET_")
    }
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn variable_name(&self, id: &str) -> String {
        let suffix: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch_secret(&self, id: &str) -> Result<SecretValue, SecretError> {
        let name = self.variable_name(id);
        match std::env::var(&name) {
            Ok(value) if !value.is_empty() => Ok(SecretValue::new(value)),
            Ok(_) | Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(id.to_string())),
            Err(e) => Err(SecretError::Backend(format!("{}: {}", name, e))),
        }
    }
}
