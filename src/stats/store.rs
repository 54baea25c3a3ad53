use super::types::{ErrorLogEntry, StatEvent};
use crate::storage::ensure_schema_version;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Append-only sink for usage statistics and persisted error logs.
pub trait StatsStore: Send + Sync {
    fn log_statistic<'a>(
        &'a self,
        event: &'a StatEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn log_error<'a>(
        &'a self,
        entry: &'a ErrorLogEntry,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

pub struct SqliteStatsStore {
    pool: SqlitePool,
}

const STATS_SCHEMA_VERSION_KEY: &str = "stats_schema_version";
const STATS_SCHEMA_VERSION: u32 = 1;

impl SqliteStatsStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_schema_version(
            &pool,
            STATS_SCHEMA_VERSION_KEY,
            STATS_SCHEMA_VERSION,
            &["statistics", "logs"],
        )
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS statistics (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id INTEGER NOT NULL,
                 action_type TEXT NOT NULL,
                 action_data TEXT,
                 session_messages_count INTEGER,
                 model_used TEXT,
                 tokens_used INTEGER,
                 response_time_ms INTEGER,
                 error_occurred INTEGER NOT NULL DEFAULT 0,
                 error_message TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create statistics table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_statistics_user
                 ON statistics(user_id, created_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS logs (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 level TEXT NOT NULL,
                 message TEXT NOT NULL,
                 context TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create logs table")?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StatsStore for SqliteStatsStore {
    fn log_statistic<'a>(
        &'a self,
        event: &'a StatEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let action_data = event
                .action_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("serialize action data")?;
            let message_count = event
                .session_messages_count
                .map(i64::try_from)
                .transpose()
                .context("message count out of range")?;
            let response_time = event
                .response_time_ms
                .map(i64::try_from)
                .transpose()
                .context("response time out of range")?;

            sqlx::query(
                "INSERT INTO statistics (
                     user_id, action_type, action_data, session_messages_count, model_used,
                     tokens_used, response_time_ms, error_occurred, error_message, created_at
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(event.user_id.0)
            .bind(event.action.as_ref())
            .bind(action_data)
            .bind(message_count)
            .bind(event.model_used.as_deref())
            .bind(event.tokens_used.map(i64::from))
            .bind(response_time)
            .bind(event.error_occurred)
            .bind(event.error_message.as_deref())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("insert statistic")?;
            Ok(())
        })
    }

    fn log_error<'a>(
        &'a self,
        entry: &'a ErrorLogEntry,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let context = serde_json::to_string(&entry.context).context("serialize log context")?;
            sqlx::query(
                "INSERT INTO logs (level, message, context, created_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&entry.level)
            .bind(&entry.message)
            .bind(context)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("insert error log")?;
            Ok(())
        })
    }
}

/// Fire-and-forget statistics recorder used by the router.
#[derive(Clone)]
pub struct Statistics {
    store: Arc<dyn StatsStore>,
}

impl Statistics {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Persist `event`. Failures are logged at warn and never surface.
    pub async fn record(&self, event: StatEvent) {
        if let Err(e) = self.store.log_statistic(&event).await {
            tracing::warn!(
                user_id = %event.user_id,
                action = %event.action,
                "failed to record statistic: {e:#}"
            );
        }
    }
}
