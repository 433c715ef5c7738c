//! CLI commands and handlers
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::application::control::{query_param, ControlSurface, MONITORING_TIME_PARAM};
use crate::application::services::PoolWatchService;
use crate::domain::monitoring::{Monitor, MonitorSession, MonitorStats};
use crate::shared::config::AppConfig;
use crate::shared::errors::AppError;
use crate::shared::types::RiskProfile;

#[derive(Parser)]
#[command(name = "poolwatch")]
#[command(version, about = "Pool watcher and LP yield rebalancer")]
pub struct Cli {
    /// Path to config file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch pool data and re-optimize on every change
    Monitor {
        /// Total monitoring time in seconds
        #[arg(short, long)]
        duration: u64,

        /// Risk profile (stable, high-yield)
        #[arg(short, long)]
        profile: Option<RiskProfile>,

        /// Poll interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Optimize current balances once and print the result
    Optimize {
        /// Balances file (overrides config)
        #[arg(short, long)]
        balances: Option<PathBuf>,

        /// Risk profile (stable, high-yield)
        #[arg(short, long)]
        profile: Option<RiskProfile>,
    },

    /// Distribute a fresh amount of capital across the catalog
    Allocate {
        /// Amount to distribute
        #[arg(short, long)]
        capital: f64,

        /// Risk profile (stable, high-yield)
        #[arg(short, long)]
        profile: Option<RiskProfile>,
    },

    /// Handle a raw start request, e.g. "total_monitoring_time=60"
    StartRequest {
        #[arg(short, long)]
        query: String,
    },
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<(), AppError> {
        let service = PoolWatchService::new(&config)?;
        match command {
            Commands::Monitor { duration, profile, interval } => {
                Self::execute_monitor_command(&service, duration, profile, interval).await
            }
            Commands::Optimize { balances, profile } => {
                let profile = profile.unwrap_or(config.monitor.risk_profile);
                let result = service.optimize_balances(balances.as_deref(), profile).await?;
                println!("{}", result.to_json_pretty()?);
                Ok(())
            }
            Commands::Allocate { capital, profile } => {
                let profile = profile.unwrap_or(config.monitor.risk_profile);
                let result = service.allocate(capital, profile)?;
                println!("{}", serde_json::to_string_pretty(&result)?);
                Ok(())
            }
            Commands::StartRequest { query } => Self::execute_start_request(&service, &query).await,
        }
    }

    async fn execute_monitor_command(
        service: &PoolWatchService,
        duration: u64,
        profile: Option<RiskProfile>,
        interval: Option<u64>,
    ) -> Result<(), AppError> {
        let monitor = Arc::new(service.monitor(profile, interval)?);
        info!("📊 Monitoring configuration:");
        info!("   Duration: {}s", duration);
        info!("   Interval: {}s", monitor.config().interval.as_secs());
        info!("   Risk profile: {}", monitor.config().risk_profile);
        info!("   Pools: {}", service.optimizer().catalog().ids().join(", "));

        let session = monitor.start(duration).await?;
        let stats = Self::wait_or_interrupt(&monitor, session).await;
        Self::log_stats(&stats);
        Ok(())
    }

    async fn execute_start_request(service: &PoolWatchService, query: &str) -> Result<(), AppError> {
        let monitor = Arc::new(service.monitor(None, None)?);
        let surface = ControlSurface::new(Arc::clone(&monitor));

        info!(
            "Start request: {}={:?}",
            MONITORING_TIME_PARAM,
            query_param(query, MONITORING_TIME_PARAM)
        );
        let outcome = surface.start_from_query(query).await;
        println!("{}", serde_json::to_string_pretty(&outcome.response)?);

        if let Some(session) = outcome.session {
            let stats = Self::wait_or_interrupt(surface.monitor(), session).await;
            Self::log_stats(&stats);
        }
        Ok(())
    }

    /// Ctrl-C stops the session early
    async fn wait_or_interrupt(monitor: &Arc<Monitor>, session: MonitorSession) -> MonitorStats {
        let stopper = Arc::clone(monitor);
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("🛑 Interrupt received, stopping monitor");
                stopper.stop().await;
            } else {
                error!("⚠️ Failed to listen for interrupt");
            }
        });

        let stats = session.wait().await;
        interrupt.abort();
        stats
    }

    fn log_stats(stats: &MonitorStats) {
        info!("✅ Monitoring finished:");
        info!("   Ticks: {}", stats.ticks);
        info!("   Changes detected: {}", stats.triggers);
        info!("   Deferred (action in flight): {}", stats.skipped_in_flight);
        info!("   Read failures: {}", stats.read_failures);
        info!("   Optimizer failures: {}", stats.optimizer_failures);
        info!("   Actions dispatched: {}", stats.actions_dispatched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["poolwatch", "monitor", "--duration", "60", "--profile", "high-yield"]).unwrap();
        match cli.command {
            Commands::Monitor { duration, profile, interval } => {
                assert_eq!(duration, 60);
                assert_eq!(profile, Some(RiskProfile::HighYield));
                assert_eq!(interval, None);
            }
            _ => panic!("expected monitor"),
        }

        let cli = Cli::try_parse_from(["poolwatch", "--config", "my.toml", "allocate", "-c", "100"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert!(matches!(cli.command, Commands::Allocate { capital, .. } if capital == 100.0));

        assert!(Cli::try_parse_from(["poolwatch", "monitor"]).is_err());
    }
}
