use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Fixed offset for `[HH:MM]` transcript labels. `None` uses the host's local zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default = "default_max_instruction_chars")]
    pub max_instruction_chars: usize,
}

fn default_max_instruction_chars() -> usize {
    2000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: None,
            max_instruction_chars: default_max_instruction_chars(),
        }
    }
}
