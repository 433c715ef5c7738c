use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use poolwatch::application::{Cli, CommandExecutor};
use poolwatch::shared::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref())?;

    CommandExecutor::execute(cli.command, config).await?;
    Ok(())
}
