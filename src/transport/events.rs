use crate::session::{Author, BufferedItem, ItemKind, MediaRef, UserId};
use strum::{AsRefStr, Display, EnumString};

/// Bot commands the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Analyze,
    Clear,
    Help,
    Start,
}

impl Command {
    /// Parse `/name`, `/name@bot` and `/name args`. Unknown names yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        name.to_ascii_lowercase().parse().ok()
    }
}

/// Original sender of a forwarded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOrigin {
    /// Present only for forwards from visible users.
    pub source_id: Option<i64>,
    pub display_name: String,
}

/// A forwarded message, reduced to what the buffer stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedMessage {
    pub origin: ForwardOrigin,
    /// Original send time, Unix seconds.
    pub date: i64,
    pub kind: ItemKind,
    /// Literal text for `text` items.
    pub text: Option<String>,
    pub media: Option<MediaRef>,
}

impl ForwardedMessage {
    /// Build the buffered item for `owner`. Non-text kinds get the localized
    /// placeholder label instead of text.
    pub fn into_item(self, owner: UserId, locale: &str) -> BufferedItem {
        let kind = self.kind;
        let text = match kind.placeholder_key() {
            Some(key) => t!(key, locale = locale).into_owned(),
            None => self.text.unwrap_or_default(),
        };
        BufferedItem {
            author: Author::identify(owner, self.origin.source_id, self.origin.display_name),
            timestamp: self.date,
            kind,
            text,
            media: self.media.filter(|_| kind.carries_media()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Forwarded {
        user_id: UserId,
        message: ForwardedMessage,
    },
    /// Plain text that is neither a forward nor a command.
    Text { user_id: UserId, text: String },
    Command { user_id: UserId, command: Command },
    Callback {
        user_id: UserId,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Forwarded { user_id, .. }
            | Self::Text { user_id, .. }
            | Self::Command { user_id, .. }
            | Self::Callback { user_id, .. } => *user_id,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Forwarded { .. } => "forwarded",
            Self::Text { .. } => "text",
            Self::Command { .. } => "command",
            Self::Callback { .. } => "callback",
        }
    }
}
