pub mod detection;
pub mod fetcher;
pub mod transcode;
pub mod types;

pub use fetcher::{MediaFetcher, TelegramMediaFetcher};
pub use transcode::Transcoder;
pub use types::{InlineAudio, InlineImage, MediaConfig, VoiceHandling};
