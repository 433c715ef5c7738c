//! Allocation domain - pool catalog and LP-based capital allocation

pub mod catalog;
pub mod distribution;
pub mod model;
pub mod optimizer;

pub use catalog::{PoolCatalog, PoolSpec};
pub use distribution::DistributionResult;
pub use model::{LinearModel, ModelBuilder, ModelSolution, RowOp, Sense, SolveFailure, VarId};
pub use optimizer::{effective_yields, AllocationModel, Optimizer, PoolTerm, CAPITAL_SLACK, MAX_POOL_SHARE, YIELD_TIE_BREAKER};
