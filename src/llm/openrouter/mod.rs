use super::openai::compat::{self as openai_compat, Endpoint};
use crate::config::LlmConfig;
use crate::llm::{
    http_client::build_provider_client_with_timeout,
    traits::Inference,
    types::{Completion, CompletionRequest},
};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;


const PROVIDER_NAME: &str = "OpenRouter";
const OPENROUTER_EXTRA_HEADERS: [(&str, &str); 2] = [
    ("HTTP-Referer", "https://github.com/context-assistant/context-assistant"),
    ("X-Title", "Context Assistant"),
];

pub struct OpenRouterProvider {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    chat_url: String,
    transcription_url: String,
    timeout_secs: u64,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<&str>, base_url: &str, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            chat_url: format!("{base_url}/chat/completions"),
            transcription_url: format!("{base_url}/audio/transcriptions"),
            timeout_secs,
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.as_deref(),
            &config.base_url,
            config.timeout_secs,
        )
    }

    fn endpoint<'a>(&self, url: &'a str) -> Endpoint<'a> {
        Endpoint {
            provider_name: PROVIDER_NAME,
            url,
            timeout_secs: self.timeout_secs,
            extra_headers: &OPENROUTER_EXTRA_HEADERS,
        }
    }

    async fn complete_impl(&self, request: &CompletionRequest) -> anyhow::Result<Completion> {
        let chat_request = openai_compat::build_request(request);
        let started = std::time::Instant::now();
        let chat_response = openai_compat::send_chat_completions_json(
            &self.client,
            self.cached_auth_header.as_ref(),
            &chat_request,
            self.endpoint(&self.chat_url),
        )
        .await?;
        let completion =
            openai_compat::extract_completion(chat_response, PROVIDER_NAME, &request.model)?;
        tracing::debug!(
            model = %completion.model,
            tokens = ?completion.total_tokens,
            elapsed_ms = started.elapsed().as_millis(),
            "completion received"
        );
        Ok(completion)
    }
}

impl Inference for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Completion>> + Send + 'a>> {
        Box::pin(self.complete_impl(request))
    }

    fn transcribe<'a>(
        &'a self,
        model: &'a str,
        audio: &'a [u8],
        language: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            openai_compat::send_transcription(
                &self.client,
                self.cached_auth_header.as_ref(),
                audio,
                model,
                language,
                self.endpoint(&self.transcription_url),
            )
            .await
        })
    }

    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.cached_auth_header.is_none() {
                return Ok(());
            }
            // Open a pooled connection so the first user request skips the handshake.
            let _ = self.client.head(&self.chat_url).send().await;
            Ok(())
        })
    }
}
