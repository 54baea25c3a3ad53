#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use context_assistant::Config;
use context_assistant::app::Service;
use context_assistant::error::MediaError;
use context_assistant::llm::{Completion, CompletionRequest, Inference};
use context_assistant::media::{InlineAudio, InlineImage, MediaFetcher};
use context_assistant::session::{ItemKind, MediaRef, Session, SessionStore, UserId};
use context_assistant::storage::{self, Stores};
use context_assistant::transport::{
    BotCommand, CallbackNotice, ChatAction, Command, EditError, ForwardOrigin, ForwardedMessage,
    InboundEvent, Keyboard, MessageHandle, Messenger,
};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const OWNER: UserId = UserId(100);
pub const OTHER: UserId = UserId(200);

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Messenger ───────────────────────────────────────────────────────────

/// Everything the bot pushed to the chat platform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Sent {
        user_id: UserId,
        message_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        handle: MessageHandle,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Action {
        user_id: UserId,
        action: ChatAction,
    },
    Answered {
        callback_id: String,
        notice: Option<CallbackNotice>,
    },
    Commands(Vec<BotCommand>),
}

/// How the next edit should fail, if at all.
#[derive(Debug, Clone, Copy)]
pub enum EditScript {
    NotFound,
    NotModified,
    Broken,
}

#[derive(Default)]
pub struct FakeMessenger {
    next_message_id: AtomicI64,
    outgoing: Mutex<Vec<Outgoing>>,
    edit_script: Mutex<VecDeque<EditScript>>,
    fail_sends: AtomicBool,
    inbound: Mutex<Vec<InboundEvent>>,
}

impl FakeMessenger {
    pub fn script_edit(&self, script: EditScript) {
        lock(&self.edit_script).push_back(script);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Events delivered by the next `listen` call.
    pub fn queue_inbound(&self, events: Vec<InboundEvent>) {
        lock(&self.inbound).extend(events);
    }

    pub fn outgoing(&self) -> Vec<Outgoing> {
        lock(&self.outgoing).clone()
    }

    /// Text of every sent (not edited) message, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.outgoing()
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Sent { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_sent(&self) -> Option<(String, Option<Keyboard>)> {
        self.outgoing().into_iter().rev().find_map(|out| match out {
            Outgoing::Sent { text, keyboard, .. } => Some((text, keyboard)),
            _ => None,
        })
    }

    pub fn edits(&self) -> Vec<(MessageHandle, String)> {
        self.outgoing()
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Edited { handle, text, .. } => Some((handle, text)),
                _ => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<(String, Option<CallbackNotice>)> {
        self.outgoing()
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Answered {
                    callback_id,
                    notice,
                } => Some((callback_id, notice)),
                _ => None,
            })
            .collect()
    }

    pub fn chat_actions(&self) -> Vec<ChatAction> {
        self.outgoing()
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Action { action, .. } => Some(action),
                _ => None,
            })
            .collect()
    }

    fn push(&self, out: Outgoing) {
        lock(&self.outgoing).push(out);
    }
}

impl Messenger for FakeMessenger {
    fn name(&self) -> &str {
        "fake"
    }

    fn send_message<'a>(
        &'a self,
        user_id: UserId,
        text: &'a str,
        keyboard: Option<&'a Keyboard>,
    ) -> BoxFuture<'a, anyhow::Result<MessageHandle>> {
        Box::pin(async move {
            if self.fail_sends.load(Ordering::SeqCst) {
                anyhow::bail!("sendMessage failed: network down");
            }
            let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.push(Outgoing::Sent {
                user_id,
                message_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(MessageHandle {
                user_id,
                message_id,
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
            match lock(&self.edit_script).pop_front() {
                Some(EditScript::NotFound) => return Err(EditError::NotFound),
                Some(EditScript::NotModified) => return Err(EditError::NotModified),
                Some(EditScript::Broken) => {
                    return Err(EditError::Other(anyhow::anyhow!("editMessageText: 500")));
                }
                None => {}
            }
            self.push(Outgoing::Edited {
                handle,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(())
        })
    }

    fn send_chat_action(
        &self,
        user_id: UserId,
        action: ChatAction,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.push(Outgoing::Action { user_id, action });
            Ok(())
        })
    }

    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        notice: Option<&'a CallbackNotice>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.push(Outgoing::Answered {
                callback_id: callback_id.to_string(),
                notice: notice.cloned(),
            });
            Ok(())
        })
    }

    fn set_commands<'a>(&'a self, commands: &'a [BotCommand]) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.push(Outgoing::Commands(commands.to_vec()));
            Ok(())
        })
    }

    fn listen(
        &self,
        tx: mpsc::Sender<InboundEvent>,
        shutdown: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let events = std::mem::take(&mut *lock(&self.inbound));
            for event in events {
                if shutdown.is_cancelled() || tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(())
        })
    }
}

// ── Inference ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeInference {
    replies: Mutex<VecDeque<anyhow::Result<Completion>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Mutex<Option<Duration>>,
    warmups: AtomicUsize,
}

impl FakeInference {
    pub fn reply(&self, text: &str) {
        lock(&self.replies).push_back(Ok(Completion {
            text: text.to_string(),
            total_tokens: Some(42),
            model: "test/model".into(),
        }));
    }

    pub fn fail(&self, message: &str) {
        lock(&self.replies).push_back(Err(anyhow::anyhow!(message.to_string())));
    }

    pub fn slow(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn warmups(&self) -> usize {
        self.warmups.load(Ordering::SeqCst)
    }
}

impl Inference for FakeInference {
    fn name(&self) -> &str {
        "fake"
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, anyhow::Result<Completion>> {
        Box::pin(async move {
            lock(&self.requests).push(request.clone());
            let delay = *lock(&self.delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let scripted = lock(&self.replies).pop_front();
            scripted.unwrap_or_else(|| {
                Ok(Completion {
                    text: "default draft".into(),
                    total_tokens: None,
                    model: "test/model".into(),
                })
            })
        })
    }

    fn transcribe<'a>(
        &'a self,
        _model: &'a str,
        _audio: &'a [u8],
        _language: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async { Ok("transcribed words".into()) })
    }

    fn warmup(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        self.warmups.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(anyhow::anyhow!("no route to model host")) })
    }
}

// ── Media ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeMedia {
    broken: AtomicBool,
}

impl FakeMedia {
    pub fn break_downloads(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self, file_id: &str) -> Result<(), MediaError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(MediaError::Download {
                file_id: file_id.to_string(),
                message: "gone".into(),
            });
        }
        Ok(())
    }
}

impl MediaFetcher for FakeMedia {
    fn fetch_bytes<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, MediaError>> {
        Box::pin(async move {
            self.check(file_id)?;
            Ok(vec![1, 2, 3])
        })
    }

    fn fetch_inline_image<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineImage, MediaError>> {
        Box::pin(async move {
            self.check(&media.file_id)?;
            Ok(InlineImage {
                data_uri: "data:image/png;base64,AAAA".into(),
            })
        })
    }

    fn fetch_inline_audio<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineAudio, MediaError>> {
        Box::pin(async move {
            self.check(&media.file_id)?;
            Ok(InlineAudio {
                data: "UklGRg==".into(),
                format: "wav".into(),
            })
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.locale = "en".into();
    config.prompt.utc_offset_minutes = Some(0);
    config
}

pub struct Harness {
    pub messenger: Arc<FakeMessenger>,
    pub inference: Arc<FakeInference>,
    pub media: Arc<FakeMedia>,
    pub stores: Stores,
    pub pool: SqlitePool,
    pub service: Service,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = storage::open_pool("sqlite::memory:").await.unwrap();
        let stores = storage::migrate(&pool).await.unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let inference = Arc::new(FakeInference::default());
        let media = Arc::new(FakeMedia::default());
        let service = Service::new(
            &config,
            messenger.clone(),
            inference.clone(),
            media.clone(),
            &stores,
        )
        .unwrap();
        Self {
            messenger,
            inference,
            media,
            stores,
            pool,
            service,
        }
    }

    /// Dispatch `event` and wait for its flow to finish.
    pub async fn send(&self, event: InboundEvent) {
        self.service.router().dispatch(event).await.unwrap();
    }

    pub async fn session(&self, user_id: UserId) -> Option<Session> {
        self.stores.sessions.get_session(user_id).await.unwrap()
    }

    /// `action_type` of every statistic row for `user_id`, oldest first.
    pub async fn actions(&self, user_id: UserId) -> Vec<String> {
        sqlx::query_scalar("SELECT action_type FROM statistics WHERE user_id = ? ORDER BY id")
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    /// `(action_type, error_occurred, action_data)` of the newest row.
    pub async fn last_stat(&self, user_id: UserId) -> (String, bool, Option<String>) {
        sqlx::query_as(
            "SELECT action_type, error_occurred, action_data FROM statistics
             WHERE user_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }
}

// ── Event builders ──────────────────────────────────────────────────────

pub fn forward_text(user_id: UserId, from: (Option<i64>, &str), date: i64, text: &str) -> InboundEvent {
    InboundEvent::Forwarded {
        user_id,
        message: ForwardedMessage {
            origin: ForwardOrigin {
                source_id: from.0,
                display_name: from.1.to_string(),
            },
            date,
            kind: ItemKind::Text,
            text: Some(text.to_string()),
            media: None,
        },
    }
}

pub fn forward_media(user_id: UserId, kind: ItemKind, date: i64, duration: Option<u32>) -> InboundEvent {
    InboundEvent::Forwarded {
        user_id,
        message: ForwardedMessage {
            origin: ForwardOrigin {
                source_id: Some(7),
                display_name: "Anna".into(),
            },
            date,
            kind,
            text: None,
            media: Some(MediaRef {
                file_id: format!("file-{date}"),
                file_size: Some(1024),
                duration,
                mime_type: None,
                width: None,
                height: None,
            }),
        },
    }
}

pub fn text(user_id: UserId, text: &str) -> InboundEvent {
    InboundEvent::Text {
        user_id,
        text: text.to_string(),
    }
}

pub fn command(user_id: UserId, command: Command) -> InboundEvent {
    InboundEvent::Command { user_id, command }
}

pub fn callback(user_id: UserId, callback_id: &str, data: &str) -> InboundEvent {
    InboundEvent::Callback {
        user_id,
        callback_id: callback_id.to_string(),
        data: data.to_string(),
    }
}
