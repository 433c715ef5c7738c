//! Secret store implementations

pub mod env_store;

pub use env_store::EnvSecretStore;
