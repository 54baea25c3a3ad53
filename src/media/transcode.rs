use crate::error::MediaError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Sample rate expected by the `input_audio` consumers.
const TARGET_SAMPLE_RATE: &str = "16000";

/// Voice-note transcoder backed by an external `ffmpeg` binary.
///
/// Input bytes are piped to stdin and the WAV container is read back from
/// stdout, so nothing touches the filesystem.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: String,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    fn args() -> [&'static str; 15] {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-ar",
            TARGET_SAMPLE_RATE,
            "-ac",
            "1",
            "-c:a",
            "pcm_s16le",
            "-f",
            "wav",
            "-y",
            "pipe:1",
        ]
    }

    /// Convert any container ffmpeg understands into 16 kHz mono PCM WAV.
    pub async fn to_wav(&self, input: Vec<u8>) -> Result<Vec<u8>, MediaError> {
        let mut child = tokio::process::Command::new(&self.ffmpeg_path)
            .args(Self::args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::Transcode(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::Transcode("ffmpeg stdin unavailable".into()))?;
        let writer = tokio::spawn(async move {
            // ffmpeg may close stdin early on bad input; the exit status reports that.
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| MediaError::Transcode(format!("ffmpeg did not finish: {e}")))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(MediaError::Transcode("ffmpeg produced no output".into()));
        }
        Ok(output.stdout)
    }
}
