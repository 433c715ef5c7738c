//! Application layer - use cases and services

pub mod commands;
pub mod control;
pub mod services;

pub use commands::{Cli, Commands, CommandExecutor};
pub use control::{ControlResponse, ControlSurface, RejectReason};
pub use services::PoolWatchService;
