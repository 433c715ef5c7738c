//! Infrastructure - concrete data sources, secret stores and actions

pub mod execution;
pub mod secrets;
pub mod storage;

pub use execution::{CommandSubmitter, DryRunAction, WithdrawalAction};
pub use secrets::EnvSecretStore;
pub use storage::JsonFileSource;
