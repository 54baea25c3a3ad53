use super::super::{
    LimitsConfig, LlmConfig, MediaConfig, PromptConfig, StorageConfig, TelegramConfig,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

fn default_locale() -> String {
    "ru".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            locale: default_locale(),
            log_level: default_log_level(),
            telegram: TelegramConfig::default(),
            llm: LlmConfig::default(),
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
            media: MediaConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

const MASK: &str = "***";

/// A fixed offset must stay under one day.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

impl Config {
    /// Structural checks that hold for every subcommand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_messages == 0
            || limits.max_images == 0
            || limits.max_voice == 0
            || limits.max_voice_duration_secs == 0
        {
            return Err(ConfigError::Validation(
                "limits must all be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature {} is outside 0.0..=2.0",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 || self.llm.multimodal_max_tokens == 0 {
            return Err(ConfigError::Validation(
                "llm token budgets must be greater than zero".into(),
            ));
        }
        if self.llm.timeout_secs == 0 || self.media.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeouts must be greater than zero".into(),
            ));
        }
        if self.prompt.max_instruction_chars == 0 {
            return Err(ConfigError::Validation(
                "prompt.max_instruction_chars must be greater than zero".into(),
            ));
        }
        if let Some(minutes) = self.prompt.utc_offset_minutes.filter(|minutes| {
            !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(minutes)
        }) {
            return Err(ConfigError::Validation(format!(
                "prompt.utc_offset_minutes {minutes} is outside ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        Ok(())
    }

    /// Credentials required to actually serve traffic.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token is not set (or TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        if self
            .llm
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "llm.api_key is not set (or OPENROUTER_API_KEY)".into(),
            ));
        }
        Ok(())
    }

    /// Copy with secrets replaced, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.telegram.bot_token.is_empty() {
            copy.telegram.bot_token = MASK.into();
        }
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some(MASK.into());
        }
        copy
    }
}
