use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

/// Telegram numeric user id. One session per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Forwards are being buffered.
    Collecting,
    /// Analyze was requested; waiting for a preset or a free-text instruction.
    WaitingAction,
    /// At least one response was produced; further instructions reuse the buffer.
    Conversation,
}

/// Who wrote a buffered message, as seen from the session owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub is_self: bool,
    pub display_name: String,
    #[serde(default)]
    pub source_id: Option<i64>,
}

impl Author {
    /// Hidden senders and channel posts carry no id and are never the owner.
    pub fn identify(owner: UserId, source_id: Option<i64>, display_name: impl Into<String>) -> Self {
        Self {
            is_self: source_id == Some(owner.0),
            display_name: display_name.into(),
            source_id,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
    Text,
    Image,
    Voice,
    Video,
    Sticker,
    Document,
    Audio,
    VideoNote,
}

impl ItemKind {
    /// Kinds whose payload can be inlined into a model request.
    pub fn carries_media(self) -> bool {
        matches!(self, Self::Image | Self::Voice)
    }

    /// Translation key of the label stored in place of text.
    pub fn placeholder_key(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Image => Some("placeholder.image"),
            Self::Voice => Some("placeholder.voice"),
            Self::Video => Some("placeholder.video"),
            Self::Sticker => Some("placeholder.sticker"),
            Self::Document => Some("placeholder.document"),
            Self::Audio => Some("placeholder.audio"),
            Self::VideoNote => Some("placeholder.video_note"),
        }
    }
}

/// Reference to a Telegram file attached to an image or voice item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Seconds, voice only.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedItem {
    pub author: Author,
    /// Origin send time, Unix seconds.
    pub timestamp: i64,
    pub kind: ItemKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

impl BufferedItem {
    pub fn has_resolvable_media(&self) -> bool {
        self.kind.carries_media() && self.media.is_some()
    }

    pub fn voice_duration(&self) -> Option<u32> {
        if self.kind == ItemKind::Voice {
            self.media.as_ref().and_then(|media| media.duration)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total_messages: usize,
    pub image_count: usize,
    pub voice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    pub messages: Vec<BufferedItem>,
    pub last_instruction: Option<String>,
    pub last_message_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn stats(&self) -> SessionStats {
        self.messages
            .iter()
            .fold(SessionStats::default(), |mut stats, item| {
                stats.total_messages += 1;
                match item.kind {
                    ItemKind::Image => stats.image_count += 1,
                    ItemKind::Voice => stats.voice_count += 1,
                    _ => {}
                }
                stats
            })
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Partial update of the scalar session columns. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPatch {
    state: Option<SessionState>,
    last_instruction: Option<Option<String>>,
    last_message_id: Option<Option<i64>>,
}

impl SessionPatch {
    pub fn builder() -> SessionPatchBuilder {
        SessionPatchBuilder::default()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.state
    }

    /// `Some(None)` clears the column.
    pub fn last_instruction(&self) -> Option<Option<&str>> {
        self.last_instruction.as_ref().map(Option::as_deref)
    }

    /// `Some(None)` clears the column.
    pub fn last_message_id(&self) -> Option<Option<i64>> {
        self.last_message_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionPatchBuilder {
    state: Option<SessionState>,
    last_instruction: Option<Option<String>>,
    last_message_id: Option<Option<i64>>,
}

impl SessionPatchBuilder {
    pub fn state(mut self, state: SessionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn last_instruction(mut self, instruction: Option<String>) -> Self {
        self.last_instruction = Some(instruction);
        self
    }

    pub fn last_message_id(mut self, message_id: Option<i64>) -> Self {
        self.last_message_id = Some(message_id);
        self
    }

    pub fn build(self) -> Result<SessionPatch, SessionError> {
        if self.state.is_none() && self.last_instruction.is_none() && self.last_message_id.is_none()
        {
            return Err(SessionError::EmptyPatch);
        }
        Ok(SessionPatch {
            state: self.state,
            last_instruction: self.last_instruction,
            last_message_id: self.last_message_id,
        })
    }
}
