use super::commands::help_text;
use super::replies::{CallbackAction, action_keyboard, analyze_keyboard, regenerate_keyboard};
use crate::config::PromptConfig;
use crate::llm::scrub_secret_patterns;
use crate::prompt::{ContextAssembler, Instruction, InstructionError, Preset};
use crate::session::{
    AnalyzeOutcome, IngestOutcome, InstructionGate, LaneTicket, RegenerationGate, SerialLanes,
    Session, SessionManager, SessionState, UserId,
};
use crate::stats::{StatAction, StatEvent, Statistics};
use crate::transport::{
    CallbackNotice, ChatAction, Command, EditError, ForwardedMessage, InboundEvent, Keyboard,
    MessageHandle, Messenger,
};
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

/// Everything a flow needs. Shared by all lanes.
struct RouterContext {
    messenger: Arc<dyn Messenger>,
    sessions: SessionManager,
    assembler: ContextAssembler,
    stats: Statistics,
    locale: String,
    max_instruction_chars: usize,
}

/// Dispatches inbound events onto per-user lanes.
///
/// Every branch that reaches the user produces exactly one message (or one
/// callback answer) and records exactly one statistic. Failures inside a flow
/// are reported to the user as a generic notice and never escape the lane.
#[derive(Clone)]
pub struct Router {
    context: Arc<RouterContext>,
    lanes: SerialLanes,
}

impl Router {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        sessions: SessionManager,
        assembler: ContextAssembler,
        stats: Statistics,
        prompt: &PromptConfig,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            context: Arc::new(RouterContext {
                messenger,
                sessions,
                assembler,
                stats,
                locale: locale.into(),
                max_instruction_chars: prompt.max_instruction_chars,
            }),
            lanes: SerialLanes::new(),
        }
    }

    pub fn lanes(&self) -> &SerialLanes {
        &self.lanes
    }

    /// Queue `event` behind earlier work for the same user. The returned
    /// ticket may be dropped without cancelling the flow.
    pub fn dispatch(&self, event: InboundEvent) -> LaneTicket<()> {
        let context = Arc::clone(&self.context);
        let user_id = event.user_id();
        tracing::debug!(user_id = %user_id, kind = event.kind(), "dispatching event");
        self.lanes.submit(user_id, async move {
            context.handle(event).await;
            Ok(())
        })
    }
}

impl RouterContext {
    async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Forwarded { user_id, message } => {
                if let Err(e) = self.on_forward(user_id, message).await {
                    self.fail(user_id, StatAction::ForwardError, &e).await;
                }
            }
            InboundEvent::Text { user_id, text } => {
                if let Err(e) = self.on_text(user_id, &text).await {
                    self.fail(user_id, StatAction::MessageError, &e).await;
                }
            }
            InboundEvent::Command { user_id, command } => self.on_command(user_id, command).await,
            InboundEvent::Callback {
                user_id,
                callback_id,
                data,
            } => self.on_callback(user_id, &callback_id, &data).await,
        }
    }

    async fn say(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageHandle> {
        self.messenger.send_message(user_id, text, keyboard).await
    }

    /// Transient failure boundary for message flows.
    async fn fail(&self, user_id: UserId, action: StatAction, error: &anyhow::Error) {
        let detail = scrub_secret_patterns(&format!("{error:#}")).into_owned();
        tracing::error!(user_id = %user_id, action = %action, "flow failed: {detail}");

        let notice = t!("replies.unavailable", locale = self.locale.as_str());
        if let Err(e) = self.say(user_id, &notice, None).await {
            tracing::warn!(user_id = %user_id, "could not deliver failure notice: {e}");
        }
        self.stats
            .record(StatEvent::new(user_id, action).failed(detail))
            .await;
    }

    // ── Forwards ────────────────────────────────────────────────────────

    async fn on_forward(&self, user_id: UserId, message: ForwardedMessage) -> Result<()> {
        let item = message.into_item(user_id, &self.locale);
        let kind = item.kind;

        match self.sessions.ingest(user_id, item).await? {
            IngestOutcome::Accepted(session) => {
                self.show_progress(&session).await?;
                self.stats
                    .record(
                        StatEvent::new(user_id, StatAction::ForwardMessage)
                            .with_message_count(session.messages.len())
                            .with_data(json!({ "kind": kind.as_ref() })),
                    )
                    .await;
            }
            IngestOutcome::Rejected { kind: limit, buffered } => {
                let reason = self.sessions.validator().reason(limit);
                self.say(user_id, &reason, None).await?;
                self.stats
                    .record(
                        StatEvent::new(user_id, StatAction::LimitExceeded)
                            .with_message_count(buffered.messages.len())
                            .with_data(json!({ "limit_type": limit.as_ref() })),
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Edit the progress message in place, or send a fresh one when there is
    /// nothing to edit.
    async fn show_progress(&self, session: &Session) -> Result<()> {
        let user_id = session.user_id;
        let text = self.sessions.validator().format_progress_message(session);
        let keyboard = analyze_keyboard(&self.locale);

        if let Some(message_id) = session.last_message_id {
            let handle = MessageHandle {
                user_id,
                message_id,
            };
            match self
                .messenger
                .edit_message_text(handle, &text, Some(&keyboard))
                .await
            {
                Ok(()) => return Ok(()),
                Err(EditError::NotModified) => {
                    tracing::debug!(user_id = %user_id, "progress message not modified");
                    return Ok(());
                }
                Err(EditError::NotFound) => {
                    tracing::warn!(
                        user_id = %user_id,
                        old_message_id = message_id,
                        "progress message is gone, sending a new one"
                    );
                }
                Err(EditError::Other(e)) => return Err(e),
            }
        }

        let handle = self.say(user_id, &text, Some(&keyboard)).await?;
        // Already delivered, so a lost id only costs a fresh message next time.
        if let Err(e) = self
            .sessions
            .remember_notification(user_id, Some(handle.message_id))
            .await
        {
            tracing::warn!(user_id = %user_id, "progress message id not saved: {e:#}");
        }
        Ok(())
    }

    // ── Free text ───────────────────────────────────────────────────────

    async fn on_text(&self, user_id: UserId, text: &str) -> Result<()> {
        let locale = self.locale.as_str();
        let session = match self.sessions.instruction_target(user_id).await? {
            InstructionGate::NoSession => {
                self.say(user_id, &t!("replies.forward_first", locale = locale), None)
                    .await?;
                self.stats
                    .record(StatEvent::new(user_id, StatAction::SessionMissing))
                    .await;
                return Ok(());
            }
            InstructionGate::NotAnalyzed => {
                self.say(user_id, &t!("replies.use_analyze", locale = locale), None)
                    .await?;
                self.stats
                    .record(
                        StatEvent::new(user_id, StatAction::InstructionRejected)
                            .with_data(json!({ "reason": "not_analyzed" })),
                    )
                    .await;
                return Ok(());
            }
            InstructionGate::Ready(session) => session,
        };

        match Instruction::custom(text, self.max_instruction_chars) {
            Ok(instruction) => {
                self.generate(user_id, &session, &instruction, StatAction::CustomRequest)
                    .await
            }
            Err(rejection) => {
                let reply = match rejection {
                    InstructionError::Empty => t!("replies.instruction_empty", locale = locale),
                    InstructionError::TooLong { max } => {
                        t!("replies.instruction_too_long", locale = locale, max = max)
                    }
                };
                self.say(user_id, &reply, None).await?;
                self.stats
                    .record(
                        StatEvent::new(user_id, StatAction::InstructionRejected)
                            .with_message_count(session.messages.len())
                            .with_data(json!({ "reason": rejection.to_string() })),
                    )
                    .await;
                Ok(())
            }
        }
    }

    /// Run the model over the buffer, reply with a regenerate button, and
    /// remember the instruction.
    async fn generate(
        &self,
        user_id: UserId,
        session: &Session,
        instruction: &Instruction,
        action: StatAction,
    ) -> Result<()> {
        let chat_action = if ContextAssembler::uses_media(&session.messages) {
            ChatAction::UploadPhoto
        } else {
            ChatAction::Typing
        };
        if let Err(e) = self.messenger.send_chat_action(user_id, chat_action).await {
            tracing::debug!(user_id = %user_id, "chat action failed: {e}");
        }

        let reply = self.assembler.run(&session.messages, instruction).await?;
        self.say(user_id, &reply.text, Some(&regenerate_keyboard(&self.locale)))
            .await?;
        if let Err(e) = self
            .sessions
            .record_instruction(user_id, instruction.stored_key())
            .await
        {
            tracing::warn!(user_id = %user_id, "reply delivered but instruction not saved: {e:#}");
        }

        let metadata = &reply.metadata;
        tracing::info!(
            user_id = %user_id,
            action = %action,
            model = %metadata.model,
            tokens = metadata.tokens,
            response_time_ms = metadata.response_time_ms,
            used_media = metadata.used_media,
            "reply delivered"
        );
        self.stats
            .record(
                StatEvent::new(user_id, action)
                    .with_message_count(session.messages.len())
                    .with_completion(&metadata.model, metadata.tokens, metadata.response_time_ms)
                    .with_data(json!({ "used_media": metadata.used_media })),
            )
            .await;
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────────

    async fn on_command(&self, user_id: UserId, command: Command) {
        let (outcome, failure) = match command {
            Command::Analyze => (self.analyze(user_id).await, StatAction::AnalyzeError),
            Command::Clear => (
                self.clear(user_id, StatAction::ClearCommand).await,
                StatAction::ClearError,
            ),
            Command::Help | Command::Start => (self.help(user_id).await, StatAction::HelpError),
        };
        if let Err(e) = outcome {
            self.fail(user_id, failure, &e).await;
        }
    }

    async fn analyze(&self, user_id: UserId) -> Result<()> {
        let locale = self.locale.as_str();
        match self.sessions.begin_analysis(user_id).await? {
            AnalyzeOutcome::Empty => {
                self.say(user_id, &t!("replies.empty_buffer", locale = locale), None)
                    .await?;
                self.stats
                    .record(StatEvent::new(user_id, StatAction::AnalyzeEmpty))
                    .await;
            }
            AnalyzeOutcome::Ready { count } => {
                let text = t!("replies.choose_action", locale = locale, count = count);
                self.say(user_id, &text, Some(&action_keyboard(locale)))
                    .await?;
                self.stats
                    .record(
                        StatEvent::new(user_id, StatAction::AnalyzeClicked)
                            .with_message_count(count),
                    )
                    .await;
            }
        }
        Ok(())
    }

    async fn clear(&self, user_id: UserId, action: StatAction) -> Result<()> {
        let existed = self.sessions.clear(user_id).await?;
        tracing::debug!(user_id = %user_id, existed, "session cleared");
        self.say(
            user_id,
            &t!("replies.cleared", locale = self.locale.as_str()),
            None,
        )
        .await?;
        self.stats.record(StatEvent::new(user_id, action)).await;
        Ok(())
    }

    async fn help(&self, user_id: UserId) -> Result<()> {
        self.say(user_id, &help_text(&self.locale), None).await?;
        self.stats
            .record(StatEvent::new(user_id, StatAction::HelpCommand))
            .await;
        Ok(())
    }

    // ── Callbacks ───────────────────────────────────────────────────────

    async fn on_callback(&self, user_id: UserId, callback_id: &str, data: &str) {
        let Some(action) = CallbackAction::parse(data) else {
            tracing::warn!(user_id = %user_id, "rejecting unknown callback payload");
            let notice =
                CallbackNotice::alert(t!("replies.unknown_action", locale = self.locale.as_str()));
            self.answer(callback_id, Some(&notice)).await;
            let shown: String = data.chars().take(64).collect();
            self.stats
                .record(
                    StatEvent::new(user_id, StatAction::CallbackRejected)
                        .with_data(json!({ "data": shown })),
                )
                .await;
            return;
        };

        if let Err(e) = self.on_action(user_id, callback_id, action).await {
            let detail = scrub_secret_patterns(&format!("{e:#}")).into_owned();
            tracing::error!(user_id = %user_id, action = %action, "callback failed: {detail}");
            let notice = CallbackNotice::alert(t!(
                "replies.unavailable_short",
                locale = self.locale.as_str()
            ));
            self.answer(callback_id, Some(&notice)).await;
            self.stats
                .record(StatEvent::new(user_id, StatAction::CallbackError).failed(detail))
                .await;
        }
    }

    /// Callback answers are acknowledgements; a failed one is not worth a
    /// second notice.
    async fn answer(&self, callback_id: &str, notice: Option<&CallbackNotice>) {
        if let Err(e) = self.messenger.answer_callback(callback_id, notice).await {
            tracing::debug!(callback_id, "answerCallbackQuery failed: {e}");
        }
    }

    async fn reject(&self, user_id: UserId, callback_id: &str, key: &str, action: StatAction) {
        let notice = CallbackNotice::alert(t!(key, locale = self.locale.as_str()));
        self.answer(callback_id, Some(&notice)).await;
        self.stats.record(StatEvent::new(user_id, action)).await;
    }

    async fn on_action(
        &self,
        user_id: UserId,
        callback_id: &str,
        action: CallbackAction,
    ) -> Result<()> {
        let Some(session) = self.sessions.session(user_id).await? else {
            self.reject(
                user_id,
                callback_id,
                "replies.session_expired",
                StatAction::SessionMissing,
            )
            .await;
            return Ok(());
        };

        match action {
            CallbackAction::Analyze => self.analyze(user_id).await?,
            CallbackAction::Clear => self.clear(user_id, StatAction::ButtonClear).await?,
            CallbackAction::Regenerate => {
                match self.sessions.regeneration_target(user_id).await? {
                    RegenerationGate::Ready {
                        session,
                        instruction,
                    } => {
                        let instruction = Instruction::from_stored(&instruction);
                        self.generate(user_id, &session, &instruction, StatAction::Regenerate)
                            .await?;
                    }
                    RegenerationGate::NoInstruction | RegenerationGate::NoSession => {
                        self.reject(
                            user_id,
                            callback_id,
                            "replies.no_previous_instruction",
                            StatAction::RegenerateRejected,
                        )
                        .await;
                        return Ok(());
                    }
                }
            }
            CallbackAction::Preset(preset) => {
                if session.state == SessionState::Collecting {
                    self.reject(
                        user_id,
                        callback_id,
                        "replies.use_analyze",
                        StatAction::InstructionRejected,
                    )
                    .await;
                    return Ok(());
                }
                let stat = match preset {
                    Preset::Summary => StatAction::ButtonSummary,
                    Preset::Formal => StatAction::ButtonFormal,
                    Preset::Friendly => StatAction::ButtonFriendly,
                };
                self.generate(user_id, &session, &Instruction::Preset(preset), stat)
                    .await?;
            }
        }

        self.answer(callback_id, None).await;
        Ok(())
    }
}
