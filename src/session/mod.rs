pub mod lanes;
pub mod limits;
pub mod manager;
pub mod store;
pub mod types;

pub use lanes::{LaneTicket, SerialLanes};
pub use limits::{LimitKind, LimitsValidator};
pub use manager::{
    AnalyzeOutcome, IngestOutcome, InstructionGate, RegenerationGate, SessionManager,
};
pub use store::{SessionStore, SqliteSessionStore};
pub use types::{
    Author, BufferedItem, ItemKind, MediaRef, Session, SessionPatch, SessionPatchBuilder,
    SessionState, SessionStats, UserId,
};
