//! Allocation actions

pub mod command_submitter;
pub mod dry_run;
pub mod withdrawal;

pub use command_submitter::CommandSubmitter;
pub use dry_run::DryRunAction;
pub use withdrawal::WithdrawalAction;
