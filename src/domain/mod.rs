//! Domain layer - core business logic and entities

pub mod allocation;
pub mod monitoring;
pub mod execution;
