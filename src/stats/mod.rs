pub mod store;
pub mod types;

pub use store::{SqliteStatsStore, Statistics, StatsStore};
pub use types::{ErrorLogEntry, StatAction, StatEvent};
