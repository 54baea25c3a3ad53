use super::limits::{LimitKind, LimitsValidator};
use super::store::SessionStore;
use super::types::{BufferedItem, Session, SessionPatch, SessionState, UserId};
use anyhow::Result;
use std::sync::Arc;

/// Result of offering a forwarded item to the buffer.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The item was merged; carries the updated session.
    Accepted(Session),
    /// A limit rejected the item; the buffer is unchanged.
    Rejected { kind: LimitKind, buffered: Session },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    Empty,
    Ready { count: usize },
}

/// Whether a free-text or preset instruction can run right now.
#[derive(Debug, Clone)]
pub enum InstructionGate {
    NoSession,
    /// Still collecting: the user must trigger analyze first.
    NotAnalyzed,
    Ready(Session),
}

#[derive(Debug, Clone)]
pub enum RegenerationGate {
    NoSession,
    NoInstruction,
    Ready { session: Session, instruction: String },
}

/// Session state machine: `collecting -> waiting_action -> conversation`,
/// with any new forward outside `collecting` starting a fresh buffer.
///
/// Callers must run every method for a given user inside that user's serial
/// lane; the manager itself holds no locks.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    validator: LimitsValidator,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, validator: LimitsValidator) -> Self {
        Self { store, validator }
    }

    pub fn validator(&self) -> &LimitsValidator {
        &self.validator
    }

    /// Access the underlying store.
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub async fn session(&self, user_id: UserId) -> Result<Option<Session>> {
        self.store.get_session(user_id).await
    }

    /// Validate then append. A forward that arrives after analysis starts a
    /// new buffer before validation.
    pub async fn ingest(&self, user_id: UserId, item: BufferedItem) -> Result<IngestOutcome> {
        let mut session = self
            .store
            .get_or_create_session(user_id, SessionState::Collecting)
            .await?;

        if session.state != SessionState::Collecting {
            tracing::debug!(user_id = %user_id, from = %session.state, "new forward resets session");
            session = self.store.reset_session(user_id).await?;
        }

        if let Err(kind) = self.validator.validate_new_message(&session, &item) {
            tracing::info!(user_id = %user_id, limit = %kind, "forward rejected by limit");
            return Ok(IngestOutcome::Rejected {
                kind,
                buffered: session,
            });
        }

        let session = self.store.append_message_sorted(user_id, &item).await?;
        Ok(IngestOutcome::Accepted(session))
    }

    /// `collecting -> waiting_action` when something is buffered. Also
    /// re-enters `waiting_action` from the later states so the action menu
    /// can be shown again.
    pub async fn begin_analysis(&self, user_id: UserId) -> Result<AnalyzeOutcome> {
        let Some(session) = self.store.get_session(user_id).await? else {
            return Ok(AnalyzeOutcome::Empty);
        };
        if session.is_empty() {
            return Ok(AnalyzeOutcome::Empty);
        }

        let patch = SessionPatch::builder()
            .state(SessionState::WaitingAction)
            .build()?;
        let session = self.store.update_session(user_id, &patch).await?;
        Ok(AnalyzeOutcome::Ready {
            count: session.messages.len(),
        })
    }

    pub async fn instruction_target(&self, user_id: UserId) -> Result<InstructionGate> {
        Ok(match self.store.get_session(user_id).await? {
            None => InstructionGate::NoSession,
            Some(session) if session.state == SessionState::Collecting => {
                InstructionGate::NotAnalyzed
            }
            Some(session) => InstructionGate::Ready(session),
        })
    }

    /// Enter (or stay in) `conversation` and remember the instruction for
    /// regeneration.
    pub async fn record_instruction(&self, user_id: UserId, instruction: &str) -> Result<Session> {
        let patch = SessionPatch::builder()
            .state(SessionState::Conversation)
            .last_instruction(Some(instruction.to_string()))
            .build()?;
        self.store.update_session(user_id, &patch).await
    }

    pub async fn regeneration_target(&self, user_id: UserId) -> Result<RegenerationGate> {
        let Some(session) = self.store.get_session(user_id).await? else {
            return Ok(RegenerationGate::NoSession);
        };
        Ok(match session.last_instruction.clone() {
            Some(instruction) if !instruction.is_empty() => RegenerationGate::Ready {
                session,
                instruction,
            },
            _ => RegenerationGate::NoInstruction,
        })
    }

    /// Drop the session entirely. Returns whether one existed.
    pub async fn clear(&self, user_id: UserId) -> Result<bool> {
        self.store.delete_session(user_id).await
    }

    /// Store the handle of the progress message that future forwards edit.
    pub async fn remember_notification(
        &self,
        user_id: UserId,
        message_id: Option<i64>,
    ) -> Result<Session> {
        let patch = SessionPatch::builder()
            .last_message_id(message_id)
            .build()?;
        self.store.update_session(user_id, &patch).await
    }
}
