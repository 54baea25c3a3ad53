use serde::{Deserialize, Serialize};

/// Admission limits for a single buffered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_max_voice")]
    pub max_voice: usize,
    #[serde(default = "default_max_voice_duration_secs")]
    pub max_voice_duration_secs: u32,
}

fn default_max_messages() -> usize {
    50
}

fn default_max_images() -> usize {
    5
}

fn default_max_voice() -> usize {
    7
}

fn default_max_voice_duration_secs() -> u32 {
    60
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_images: default_max_images(),
            max_voice: default_max_voice(),
            max_voice_duration_secs: default_max_voice_duration_secs(),
        }
    }
}
