use super::detection::detect_image_mime;
use super::transcode::Transcoder;
use super::types::{InlineAudio, InlineImage, MediaConfig};
use crate::error::MediaError;
use crate::session::MediaRef;
use crate::transport::TelegramChannel;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves buffered media references into request-ready payloads.
pub trait MediaFetcher: Send + Sync {
    /// Raw file contents as stored by the chat platform.
    fn fetch_bytes<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, MediaError>>;

    /// Image as a `data:` URI.
    fn fetch_inline_image<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineImage, MediaError>>;

    /// Voice note transcoded to 16 kHz mono PCM WAV, base64 encoded.
    fn fetch_inline_audio<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineAudio, MediaError>>;
}

/// Downloads through the Bot API file endpoint and transcodes with ffmpeg.
pub struct TelegramMediaFetcher {
    channel: Arc<TelegramChannel>,
    transcoder: Transcoder,
    timeout: Duration,
}

impl TelegramMediaFetcher {
    pub fn new(channel: Arc<TelegramChannel>, config: &MediaConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self {
            channel,
            transcoder: Transcoder::new(config.ffmpeg_path.clone(), timeout),
            timeout,
        }
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, MediaError> {
        let bytes = tokio::time::timeout(self.timeout, self.channel.download_file(file_id))
            .await
            .map_err(|_| MediaError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| MediaError::Download {
                file_id: file_id.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(file_id, bytes = bytes.len(), "media downloaded");
        Ok(bytes)
    }
}

/// `data:<mime>;base64,<payload>` for an image download.
pub fn image_data_uri(bytes: &[u8], declared_mime: Option<&str>) -> InlineImage {
    let mime = detect_image_mime(bytes, declared_mime);
    InlineImage {
        data_uri: format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes)),
    }
}

/// Bare base64 WAV payload for an `input_audio` part.
pub fn wav_payload(wav: &[u8]) -> InlineAudio {
    InlineAudio {
        data: BASE64_STANDARD.encode(wav),
        format: "wav".to_string(),
    }
}

impl MediaFetcher for TelegramMediaFetcher {
    fn fetch_bytes<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, MediaError>> {
        Box::pin(self.download(file_id))
    }

    fn fetch_inline_image<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineImage, MediaError>> {
        Box::pin(async move {
            let bytes = self.download(&media.file_id).await?;
            Ok(image_data_uri(&bytes, media.mime_type.as_deref()))
        })
    }

    fn fetch_inline_audio<'a>(
        &'a self,
        media: &'a MediaRef,
    ) -> BoxFuture<'a, Result<InlineAudio, MediaError>> {
        Box::pin(async move {
            let bytes = self.download(&media.file_id).await?;
            let wav = self.transcoder.to_wav(bytes).await?;
            Ok(wav_payload(&wav))
        })
    }
}
