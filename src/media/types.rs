use serde::{Deserialize, Serialize};

/// How buffered voice notes reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceHandling {
    /// Transcode to WAV and attach as an `input_audio` part.
    #[default]
    Inline,
    /// Transcribe first and attach the transcript as text.
    Transcribe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Upper bound for one download or one transcode.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub voice_handling: VoiceHandling,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_timeout_secs(),
            voice_handling: VoiceHandling::default(),
        }
    }
}

/// Image ready to embed in a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub data_uri: String,
}

/// Audio ready to embed as an `input_audio` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAudio {
    /// Base64 payload without a data-URI prefix.
    pub data: String,
    pub format: String,
}
