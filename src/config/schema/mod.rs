mod channels;
mod core;
mod limits;
mod llm;
mod prompt;
mod storage;

pub use crate::media::types::MediaConfig;
pub use channels::TelegramConfig;
pub use core::Config;
pub use limits::LimitsConfig;
pub use llm::LlmConfig;
pub use prompt::PromptConfig;
pub use storage::StorageConfig;
