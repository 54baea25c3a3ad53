use super::api::{Message, MessageOrigin, Update};
use crate::session::{ItemKind, MediaRef, UserId};
use crate::transport::events::{Command, ForwardOrigin, ForwardedMessage, InboundEvent};

const UNKNOWN_SENDER: &str = "Unknown";

/// Map one update to an inbound event. Updates the assistant does not act on
/// (group chats, unsupported forwards, unknown commands, direct media) yield
/// `None`.
pub(super) fn to_event(update: Update) -> Option<InboundEvent> {
    if let Some(query) = update.callback_query {
        return Some(InboundEvent::Callback {
            user_id: UserId(query.from.id),
            callback_id: query.id,
            data: query.data.unwrap_or_default(),
        });
    }

    let message = update.message?;
    if message.chat.kind != "private" {
        tracing::debug!(chat_id = message.chat.id, kind = %message.chat.kind, "ignoring non-private chat");
        return None;
    }
    let user_id = UserId(message.from.as_ref()?.id);

    if message.is_forwarded() {
        let forwarded = forwarded_message(message)?;
        return Some(InboundEvent::Forwarded {
            user_id,
            message: forwarded,
        });
    }

    let text = message.text?;
    if text.starts_with('/') {
        let Some(command) = Command::parse(&text) else {
            tracing::debug!(user_id = %user_id, "ignoring unknown command");
            return None;
        };
        return Some(InboundEvent::Command { user_id, command });
    }
    Some(InboundEvent::Text { user_id, text })
}

fn named(source_id: Option<i64>, name: Option<&str>) -> ForwardOrigin {
    ForwardOrigin {
        source_id,
        display_name: name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_SENDER)
            .to_string(),
    }
}

fn forward_origin(message: &Message) -> (ForwardOrigin, i64) {
    match &message.forward_origin {
        Some(MessageOrigin::User { date, sender_user }) => (
            named(Some(sender_user.id), Some(sender_user.first_name.as_str())),
            *date,
        ),
        Some(MessageOrigin::HiddenUser {
            date,
            sender_user_name,
        }) => (named(None, Some(sender_user_name.as_str())), *date),
        Some(MessageOrigin::Chat { date, sender_chat }) => {
            (named(None, sender_chat.title.as_deref()), *date)
        }
        Some(MessageOrigin::Channel { date, chat }) => (named(None, chat.title.as_deref()), *date),
        Some(MessageOrigin::Unknown) | None => {
            let date = message.forward_date.unwrap_or(message.date);
            let origin = match &message.forward_from {
                Some(user) => named(Some(user.id), Some(user.first_name.as_str())),
                None => named(
                    None,
                    message.forward_sender_name.as_deref().or_else(|| {
                        message
                            .forward_from_chat
                            .as_ref()
                            .and_then(|chat| chat.title.as_deref())
                    }),
                ),
            };
            (origin, date)
        }
    }
}

fn forwarded_message(message: Message) -> Option<ForwardedMessage> {
    let (origin, date) = forward_origin(&message);

    let (kind, media) = if message.text.is_some() {
        (ItemKind::Text, None)
    } else if let Some(largest) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        let media = MediaRef {
            file_id: largest.file_id.clone(),
            file_size: largest.file_size,
            duration: None,
            mime_type: None,
            width: Some(largest.width),
            height: Some(largest.height),
        };
        (ItemKind::Image, Some(media))
    } else if let Some(voice) = &message.voice {
        let media = MediaRef {
            file_id: voice.file_id.clone(),
            file_size: voice.file_size,
            duration: Some(voice.duration),
            mime_type: voice.mime_type.clone(),
            width: None,
            height: None,
        };
        (ItemKind::Voice, Some(media))
    } else if message.video.is_some() {
        (ItemKind::Video, None)
    } else if message.sticker.is_some() {
        (ItemKind::Sticker, None)
    } else if message.document.is_some() {
        (ItemKind::Document, None)
    } else if message.audio.is_some() {
        (ItemKind::Audio, None)
    } else if message.video_note.is_some() {
        (ItemKind::VideoNote, None)
    } else {
        tracing::debug!(message_id = message.message_id, "unsupported forwarded message type");
        return None;
    };

    Some(ForwardedMessage {
        origin,
        date,
        kind,
        text: message.text,
        media,
    })
}
