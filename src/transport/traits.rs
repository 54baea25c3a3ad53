use super::events::InboundEvent;
use crate::session::UserId;
use std::future::Future;
use std::pin::Pin;
use strum::{AsRefStr, Display};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A message the bot sent, addressable for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    pub user_id: UserId,
    pub message_id: i64,
}

/// Why an in-place edit did not happen.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The message was deleted or is too old to edit.
    #[error("message to edit not found")]
    NotFound,
    /// New text and markup equal the current ones.
    #[error("message is not modified")]
    NotModified,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn single(button: Button) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flatten()
            .map(|button| button.callback_data.as_str())
    }
}

/// Toast or alert shown when answering a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackNotice {
    pub text: String,
    pub show_alert: bool,
}

impl CallbackNotice {
    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_alert: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat platform the bot talks through.
pub trait Messenger: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    fn send_message<'a>(
        &'a self,
        user_id: UserId,
        text: &'a str,
        keyboard: Option<&'a Keyboard>,
    ) -> BoxFuture<'a, anyhow::Result<MessageHandle>>;

    fn edit_message_text<'a>(
        &'a self,
        handle: MessageHandle,
        text: &'a str,
        keyboard: Option<&'a Keyboard>,
    ) -> BoxFuture<'a, Result<(), EditError>>;

    fn send_chat_action(
        &self,
        user_id: UserId,
        action: ChatAction,
    ) -> BoxFuture<'_, anyhow::Result<()>>;

    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        notice: Option<&'a CallbackNotice>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;

    fn set_commands<'a>(&'a self, commands: &'a [BotCommand]) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Deliver inbound events to `tx` until `shutdown` fires or the receiver
    /// goes away.
    fn listen(
        &self,
        tx: mpsc::Sender<InboundEvent>,
        shutdown: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Check if the transport is reachable.
    fn health_check(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { true })
    }
}
