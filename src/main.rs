#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use context_assistant::Config;
use context_assistant::app;
use context_assistant::cli::Cli;
use context_assistant::observability;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init(cli.config.as_deref())?;
    let error_logs = observability::init_tracing(&config.log_level)?;
    tracing::debug!(path = %config.config_path.display(), "configuration loaded");

    app::dispatch(cli, config, error_logs).await
}
