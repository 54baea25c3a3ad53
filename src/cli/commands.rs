use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Telegram assistant that drafts replies from forwarded conversations.
#[derive(Parser, Debug)]
#[command(name = "context-assistant")]
#[command(version)]
#[command(about = "Buffer forwarded messages and answer about them with an LLM.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.context-assistant/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start polling Telegram and serving users
    Run,

    /// Apply database migrations and exit
    Migrate,

    /// Print the effective configuration with secrets masked
    Config,
}
