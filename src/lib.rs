//! Poolwatch - change-triggered LP yield rebalancer
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use domain::allocation::{Optimizer, PoolCatalog, PoolSpec};
pub use domain::monitoring::{Monitor, MonitorConfig, PoolDataSource};
pub use domain::execution::{AllocationAction, RebalancePlan, SecretStore};
pub use shared::types::{AllocationResult, CapitalSnapshot, RiskProfile};
