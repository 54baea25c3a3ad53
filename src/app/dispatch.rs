use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::stats::ErrorLogEntry;
use anyhow::{Context, Result};
use tokio::sync::mpsc;

/// Run the selected subcommand. `error_logs` is the receiving half of the
/// error-log layer; only `run` persists it.
pub async fn dispatch(
    cli: Cli,
    config: Config,
    error_logs: mpsc::Receiver<ErrorLogEntry>,
) -> Result<()> {
    match cli.command {
        Commands::Run => super::service::run(&config, error_logs).await,

        Commands::Migrate => {
            let url = config.storage.resolved_url();
            let pool = crate::storage::open_pool(&url).await?;
            crate::storage::migrate(&pool).await?;
            pool.close().await;
            println!("{}", t!("cli.migrated", url = url));
            Ok(())
        }

        Commands::Config => {
            println!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

/// Effective configuration as TOML, secrets masked.
pub fn render_config(config: &Config) -> Result<String> {
    let body = toml::to_string_pretty(&config.redacted()).context("Failed to serialize config")?;
    Ok(format!("# {}\n{body}", config.config_path.display()))
}
