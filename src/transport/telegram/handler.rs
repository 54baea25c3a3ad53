use super::TelegramChannel;
use super::api::{SentMessage, Update};
use super::convert::to_event;
use crate::error::TransportError;
use crate::session::UserId;
use crate::transport::events::InboundEvent;
use crate::transport::traits::{
    BotCommand, CallbackNotice, ChatAction, EditError, Keyboard, MessageHandle, Messenger,
};
use serde::de::IgnoredAny;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

fn keyboard_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| json!({ "text": button.text, "callback_data": button.callback_data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Sort a failed edit into the cases callers handle differently.
pub(super) fn classify_edit_failure(description: &str) -> EditError {
    let lowered = description.to_ascii_lowercase();
    if lowered.contains("message is not modified") {
        EditError::NotModified
    } else if lowered.contains("message to edit not found")
        || lowered.contains("message can't be edited")
        || lowered.contains("message_id_invalid")
    {
        EditError::NotFound
    } else {
        EditError::Other(anyhow::anyhow!("editMessageText rejected: {description}"))
    }
}

impl TelegramChannel {
    async fn poll_once(&self, offset: i64) -> Result<Vec<Value>, TransportError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"]
            }),
        )
        .await
    }

    /// Parse one raw update and apply the allow-list. Malformed updates are
    /// skipped so one bad entry cannot stall the batch.
    fn accept(&self, raw: Value) -> Option<InboundEvent> {
        let update: Update = match serde_json::from_value(raw) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!("Telegram: skipping malformed update: {e}");
                return None;
            }
        };

        let sender = update.sender()?;
        let id = sender.id.to_string();
        let mut identities = vec![id.as_str()];
        if let Some(username) = sender.username.as_deref() {
            identities.push(username);
        }
        if !self.is_any_user_allowed(identities.iter().copied()) {
            tracing::warn!(
                user_id = %id,
                username = sender.username.as_deref().unwrap_or("unknown"),
                "Telegram: ignoring update from unauthorized user"
            );
            return None;
        }

        to_event(update)
    }

    async fn listen_loop(
        &self,
        tx: mpsc::Sender<InboundEvent>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut offset: i64 = 0;
        let mut backoff = INITIAL_BACKOFF;

        tracing::info!("Telegram channel listening for updates...");

        loop {
            let polled = tokio::select! {
                () = shutdown.cancelled() => break,
                polled = self.poll_once(offset) => polled,
            };

            let updates = match polled {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    updates
                }
                Err(e) => {
                    tracing::warn!(retry_in_secs = backoff.as_secs(), "Telegram poll error: {e}");
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            for raw in updates {
                // Advance past this update even if it is dropped below.
                if let Some(update_id) = raw.get("update_id").and_then(Value::as_i64) {
                    offset = offset.max(update_id + 1);
                }
                let Some(event) = self.accept(raw) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    tracing::info!("Telegram: event receiver closed, stopping poll loop");
                    return Ok(());
                }
            }
        }

        tracing::info!("Telegram channel stopped polling");
        Ok(())
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl Messenger for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send_message<'a>(
        &'a self,
        user_id: UserId,
        text: &'a str,
        keyboard: Option<&'a Keyboard>,
    ) -> BoxFuture<'a, anyhow::Result<MessageHandle>> {
        Box::pin(async move {
            let mut body = json!({ "chat_id": user_id.0, "text": text });
            if let Some(keyboard) = keyboard {
                body["reply_markup"] = keyboard_markup(keyboard);
            }
            let sent: SentMessage = self.call("sendMessage", &body).await?;
            Ok(MessageHandle {
                user_id,
                message_id: sent.message_id,
            })
        })
    }

    fn edit_message_text<'a>(
        &'a self,
        handle: MessageHandle,
        text: &'a str,
        keyboard: Option<&'a Keyboard>,
    ) -> BoxFuture<'a, Result<(), EditError>> {
        Box::pin(async move {
            let mut body = json!({
                "chat_id": handle.user_id.0,
                "message_id": handle.message_id,
                "text": text
            });
            if let Some(keyboard) = keyboard {
                body["reply_markup"] = keyboard_markup(keyboard);
            }
            match self.call::<IgnoredAny>("editMessageText", &body).await {
                Ok(_) => Ok(()),
                Err(TransportError::Api { description, .. }) => {
                    Err(classify_edit_failure(&description))
                }
                Err(other) => Err(EditError::Other(other.into())),
            }
        })
    }

    fn send_chat_action(
        &self,
        user_id: UserId,
        action: ChatAction,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.call::<IgnoredAny>(
                "sendChatAction",
                &json!({ "chat_id": user_id.0, "action": action.as_ref() }),
            )
            .await?;
            Ok(())
        })
    }

    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        notice: Option<&'a CallbackNotice>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut body = json!({ "callback_query_id": callback_id });
            if let Some(notice) = notice {
                body["text"] = json!(notice.text);
                body["show_alert"] = json!(notice.show_alert);
            }
            self.call::<IgnoredAny>("answerCallbackQuery", &body).await?;
            Ok(())
        })
    }

    fn set_commands<'a>(&'a self, commands: &'a [BotCommand]) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let commands: Vec<Value> = commands
                .iter()
                .map(|c| json!({ "command": c.command, "description": c.description }))
                .collect();
            self.call::<IgnoredAny>("setMyCommands", &json!({ "commands": commands }))
                .await?;
            Ok(())
        })
    }

    fn listen(
        &self,
        tx: mpsc::Sender<InboundEvent>,
        shutdown: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.listen_loop(tx, shutdown))
    }

    fn health_check(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.call::<IgnoredAny>("getMe", &json!({})).await.is_ok() })
    }
}
