use crate::session::UserId;
use serde::Serialize;
use strum::{AsRefStr, Display};

/// One statistic row per outward-facing router branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatAction {
    ForwardMessage,
    LimitExceeded,
    ForwardError,
    AnalyzeClicked,
    AnalyzeEmpty,
    AnalyzeError,
    ClearCommand,
    ClearError,
    HelpCommand,
    HelpError,
    CustomRequest,
    ButtonSummary,
    ButtonFormal,
    ButtonFriendly,
    ButtonClear,
    Regenerate,
    RegenerateRejected,
    InstructionRejected,
    MessageError,
    CallbackError,
    CallbackRejected,
    SessionMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatEvent {
    pub user_id: UserId,
    pub action: StatAction,
    pub action_data: Option<serde_json::Value>,
    pub session_messages_count: Option<usize>,
    pub model_used: Option<String>,
    pub tokens_used: Option<u32>,
    pub response_time_ms: Option<u64>,
    pub error_occurred: bool,
    pub error_message: Option<String>,
}

impl StatEvent {
    pub fn new(user_id: UserId, action: StatAction) -> Self {
        Self {
            user_id,
            action,
            action_data: None,
            session_messages_count: None,
            model_used: None,
            tokens_used: None,
            response_time_ms: None,
            error_occurred: false,
            error_message: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.action_data = Some(data);
        self
    }

    pub fn with_message_count(mut self, count: usize) -> Self {
        self.session_messages_count = Some(count);
        self
    }

    pub fn with_completion(mut self, model: &str, tokens: Option<u64>, elapsed_ms: u64) -> Self {
        self.model_used = Some(model.to_string());
        self.tokens_used = tokens.and_then(|t| u32::try_from(t).ok());
        self.response_time_ms = Some(elapsed_ms);
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.error_occurred = true;
        self.error_message = Some(error.into());
        self
    }
}

/// Error-level log record persisted next to the statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    pub level: String,
    pub message: String,
    pub context: serde_json::Value,
}
