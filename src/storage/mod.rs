//! SQLite pool management and schema bootstrap shared by the stores.

use crate::session::SqliteSessionStore;
use crate::stats::SqliteStatsStore;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open the pool, creating the database file and its directory if needed.
pub async fn open_pool(database_url: &str) -> Result<SqlitePool> {
    let memory = is_memory_url(database_url);
    if !memory
        && let Some(path) = database_url.strip_prefix("sqlite://")
        && let Some(parent) = Path::new(path.split('?').next().unwrap_or(path)).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database url: {database_url}"))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    let options = if memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    // Every connection to `:memory:` is a separate database.
    let max_connections = if memory { 1 } else { 4 };
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {database_url}"))
}

/// Record `version` under `key`, refusing to run against an incompatible or
/// unversioned database that already has one of `owned_tables`.
pub(crate) async fn ensure_schema_version(
    pool: &SqlitePool,
    key: &str,
    version: u32,
    owned_tables: &[&str],
) -> Result<()> {
    sqlx::query(SCHEMA_META_TABLE)
        .execute(pool)
        .await
        .context("create schema_meta table")?;

    let stored: Option<(String,)> = sqlx::query_as("SELECT value FROM schema_meta WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("load {key}"))?;

    if let Some((value,)) = stored {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("invalid {key} value: {value}"))?;
        anyhow::ensure!(
            parsed == version,
            "incompatible {key}: stored={parsed}, expected={version}. remove the database and restart."
        );
        return Ok(());
    }

    for table in owned_tables {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1")
                .bind(table)
                .fetch_one(pool)
                .await
                .context("detect unversioned tables")?;
        anyhow::ensure!(
            count == 0,
            "table {table} exists without {key} metadata. remove the database and restart."
        );
    }

    sqlx::query("INSERT INTO schema_meta (key, value) VALUES ($1, $2)")
        .bind(key)
        .bind(version.to_string())
        .execute(pool)
        .await
        .with_context(|| format!("persist {key}"))?;

    Ok(())
}

/// Both stores, with their schemas applied.
pub struct Stores {
    pub sessions: Arc<SqliteSessionStore>,
    pub stats: Arc<SqliteStatsStore>,
}

/// Create or verify every table the assistant uses.
pub async fn migrate(pool: &SqlitePool) -> Result<Stores> {
    let sessions = SqliteSessionStore::new(pool.clone()).await?;
    let stats = SqliteStatsStore::new(pool.clone()).await?;
    tracing::info!("database schema is up to date");
    Ok(Stores {
        sessions: Arc::new(sessions),
        stats: Arc::new(stats),
    })
}
