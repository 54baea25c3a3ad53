use thiserror::Error;

use crate::session::UserId;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the assistant.
///
/// Each subsystem defines its own error variant. The router matches on these
/// to pick the user-facing reply; internal code keeps using `anyhow::Result`
/// for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AssistantError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Session ─────────────────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Transport / Telegram ────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Media pipeline ──────────────────────────────────────────────────
    #[error("media: {0}")]
    Media(#[from] MediaError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} authentication failed")]
    Auth { provider: String },

    #[error("provider {provider} returned an empty completion")]
    EmptyResponse { provider: String },

    #[error("provider {provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },
}

// ─── Session errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(UserId),

    #[error("session patch must set at least one field")]
    EmptyPatch,

    #[error("store: {0}")]
    Store(String),
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram connection failed: {0}")]
    Connection(String),

    #[error("telegram send failed: {0}")]
    Send(String),

    #[error("telegram {method} rejected: {description}")]
    Api { method: String, description: String },
}

// ─── Media errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("download of {file_id} failed: {message}")]
    Download { file_id: String, message: String },

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("media step timed out after {secs}s")]
    Timeout { secs: u64 },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AssistantError>;
