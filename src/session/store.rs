use super::types::{BufferedItem, Session, SessionPatch, SessionState, UserId};
use crate::error::SessionError;
use crate::storage::ensure_schema_version;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::future::Future;
use std::pin::Pin;

/// Async session persistence contract. One row per user.
pub trait SessionStore: Send + Sync {
    fn get_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Session>>> + Send + 'a>>;

    /// Return the user's session, inserting an empty one in `initial_state`
    /// when none exists. Safe against concurrent creators.
    fn get_or_create_session<'a>(
        &'a self,
        user_id: UserId,
        initial_state: SessionState,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;

    /// Replace the session with an empty `collecting` one.
    fn reset_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;

    fn update_session<'a>(
        &'a self,
        user_id: UserId,
        patch: &'a SessionPatch,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;

    fn delete_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Insert `item` at its chronological position in one atomic statement.
    /// Items with equal timestamps keep arrival order.
    fn append_message_sorted<'a>(
        &'a self,
        user_id: UserId,
        item: &'a BufferedItem,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;
}

/// SQLite-backed session store using sqlx async pool.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

const SESSION_SCHEMA_VERSION_KEY: &str = "session_schema_version";
const SESSION_SCHEMA_VERSION: u32 = 1;

const SESSION_COLUMNS: &str =
    "user_id, state, messages, last_instruction, last_message_id, created_at, updated_at";

impl SqliteSessionStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_schema_version(
            &pool,
            SESSION_SCHEMA_VERSION_KEY,
            SESSION_SCHEMA_VERSION,
            &["sessions"],
        )
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                 user_id INTEGER PRIMARY KEY,
                 state TEXT NOT NULL DEFAULT 'collecting',
                 messages TEXT NOT NULL DEFAULT '[]',
                 last_instruction TEXT,
                 last_message_id INTEGER,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create sessions table")?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_session_row(row: &SqliteRow) -> Result<Session> {
    let state_raw: String = row.try_get("state")?;
    let messages_raw: String = row.try_get("messages")?;
    let messages: Vec<BufferedItem> =
        serde_json::from_str(&messages_raw).context("deserialize buffered messages")?;

    Ok(Session {
        user_id: UserId(row.try_get("user_id")?),
        state: state_raw
            .parse()
            .with_context(|| format!("unknown session state: {state_raw}"))?,
        messages,
        last_instruction: row.try_get("last_instruction")?,
        last_message_id: row.try_get("last_message_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl SessionStore for SqliteSessionStore {
    fn get_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Session>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1"
            ))
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .context("query session by user")?;

            row.map(|r| map_session_row(&r)).transpose()
        })
    }

    fn get_or_create_session<'a>(
        &'a self,
        user_id: UserId,
        initial_state: SessionState,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
        Box::pin(async move {
            let timestamp = Utc::now().to_rfc3339();
            sqlx::query(
                "INSERT INTO sessions (user_id, state, messages, created_at, updated_at)
                 VALUES ($1, $2, '[]', $3, $3)
                 ON CONFLICT(user_id) DO NOTHING",
            )
            .bind(user_id.0)
            .bind(initial_state.as_ref())
            .bind(&timestamp)
            .execute(&self.pool)
            .await
            .context("insert session if absent")?;

            self.get_session(user_id)
                .await?
                .ok_or_else(|| SessionError::NotFound(user_id).into())
        })
    }

    fn reset_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
        Box::pin(async move {
            let timestamp = Utc::now().to_rfc3339();
            let row = sqlx::query(&format!(
                "INSERT INTO sessions (user_id, state, messages, created_at, updated_at)
                 VALUES ($1, $2, '[]', $3, $3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     state = excluded.state,
                     messages = '[]',
                     last_instruction = NULL,
                     last_message_id = NULL,
                     created_at = excluded.created_at,
                     updated_at = excluded.updated_at
                 RETURNING {SESSION_COLUMNS}"
            ))
            .bind(user_id.0)
            .bind(SessionState::Collecting.as_ref())
            .bind(&timestamp)
            .fetch_one(&self.pool)
            .await
            .context("reset session")?;

            map_session_row(&row)
        })
    }

    fn update_session<'a>(
        &'a self,
        user_id: UserId,
        patch: &'a SessionPatch,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
        Box::pin(async move {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE sessions SET ");
            let mut assignments = query.separated(", ");
            if let Some(state) = patch.state() {
                assignments.push("state = ");
                assignments.push_bind_unseparated(state.as_ref().to_string());
            }
            if let Some(instruction) = patch.last_instruction() {
                assignments.push("last_instruction = ");
                assignments.push_bind_unseparated(instruction.map(str::to_string));
            }
            if let Some(message_id) = patch.last_message_id() {
                assignments.push("last_message_id = ");
                assignments.push_bind_unseparated(message_id);
            }
            assignments.push("updated_at = ");
            assignments.push_bind_unseparated(Utc::now().to_rfc3339());

            query.push(" WHERE user_id = ");
            query.push_bind(user_id.0);
            query.push(format!(" RETURNING {SESSION_COLUMNS}"));

            let row = query
                .build()
                .fetch_optional(&self.pool)
                .await
                .context("update session")?;

            match row {
                Some(row) => map_session_row(&row),
                None => Err(SessionError::NotFound(user_id).into()),
            }
        })
    }

    fn delete_session<'a>(
        &'a self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
                .bind(user_id.0)
                .execute(&self.pool)
                .await
                .context("delete session")?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn append_message_sorted<'a>(
        &'a self,
        user_id: UserId,
        item: &'a BufferedItem,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
        Box::pin(async move {
            let item_json = serde_json::to_string(item).context("serialize buffered item")?;
            // json_each keys are array indexes, so the secondary sort keeps
            // arrival order for equal timestamps.
            let row = sqlx::query(&format!(
                "UPDATE sessions
                 SET messages = (
                         SELECT json_group_array(
                             json(value) ORDER BY json_extract(value, '$.timestamp'), key
                         )
                         FROM json_each(json_insert(sessions.messages, '$[#]', json($1)))
                     ),
                     updated_at = $2
                 WHERE user_id = $3
                 RETURNING {SESSION_COLUMNS}"
            ))
            .bind(&item_json)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .context("append buffered item")?;

            match row {
                Some(row) => map_session_row(&row),
                None => Err(SessionError::NotFound(user_id).into()),
            }
        })
    }
}
