use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

/// Canned actions offered on the action keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Preset {
    Summary,
    Formal,
    Friendly,
}

impl Preset {
    fn directive_key(self) -> &'static str {
        match self {
            Self::Summary => "instructions.summary",
            Self::Formal => "instructions.formal",
            Self::Friendly => "instructions.friendly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstructionError {
    #[error("instruction is empty")]
    Empty,
    #[error("instruction exceeds {max} characters")]
    TooLong { max: usize },
}

/// What the model is asked to do with the buffered conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Preset(Preset),
    Custom(String),
}

impl Instruction {
    /// Validate user-typed text. Length is counted in characters.
    pub fn custom(text: &str, max_chars: usize) -> Result<Self, InstructionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(InstructionError::Empty);
        }
        if trimmed.chars().count() > max_chars {
            return Err(InstructionError::TooLong { max: max_chars });
        }
        Ok(Self::Custom(trimmed.to_string()))
    }

    /// Rebuild from the stored `last_instruction` column. Preset keys win
    /// over identical custom text.
    pub fn from_stored(stored: &str) -> Self {
        Preset::from_str(stored).map_or_else(|_| Self::Custom(stored.to_string()), Self::Preset)
    }

    /// Value persisted as `last_instruction`.
    pub fn stored_key(&self) -> &str {
        match self {
            Self::Preset(preset) => preset.as_ref(),
            Self::Custom(text) => text,
        }
    }

    /// Text placed after the task marker in the prompt.
    pub fn directive(&self, locale: &str) -> String {
        match self {
            Self::Preset(preset) => t!(preset.directive_key(), locale = locale).into_owned(),
            Self::Custom(text) => text.clone(),
        }
    }
}
