pub mod error_log;

pub use error_log::{ErrorLogLayer, persist_error_logs};

use crate::stats::ErrorLogEntry;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Parse `log_level` from config. Blank or unknown values fall back to `info`.
pub fn level_filter(level: &str) -> LevelFilter {
    let level = level.trim();
    if level.is_empty() {
        return LevelFilter::INFO;
    }
    LevelFilter::from_str(level).unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber: a stdout `fmt` layer at `level`, plus the
/// error-log layer. The returned receiver feeds [`persist_error_logs`] once
/// the database is open.
pub fn init_tracing(level: &str) -> anyhow::Result<mpsc::Receiver<ErrorLogEntry>> {
    let (error_layer, receiver) = ErrorLogLayer::channel();
    tracing_subscriber::registry()
        .with(level_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .with(error_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {e}"))?;
    Ok(receiver)
}
