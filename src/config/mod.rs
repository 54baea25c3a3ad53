pub mod schema;

pub use schema::{
    Config, LimitsConfig, LlmConfig, MediaConfig, PromptConfig, StorageConfig, TelegramConfig,
};
