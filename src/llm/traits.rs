use super::types::{Completion, CompletionRequest};
use std::future::Future;
use std::pin::Pin;

/// Language-model backend.
pub trait Inference: Send + Sync {
    /// Provider identifier (e.g. "openrouter").
    fn name(&self) -> &str;

    /// Single non-streaming chat completion.
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Completion>> + Send + 'a>>;

    /// Speech to text. `audio` is the original container (Telegram sends
    /// OGG/Opus voice notes).
    fn transcribe<'a>(
        &'a self,
        model: &'a str,
        audio: &'a [u8],
        language: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

    /// Warm up the HTTP connection pool.
    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }
}
