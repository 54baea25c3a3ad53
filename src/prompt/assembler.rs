use super::instructions::Instruction;
use super::template::PromptTemplates;
use super::transcript::TranscriptFormatter;
use crate::config::{LlmConfig, PromptConfig};
use crate::llm::{ChatMessage, CompletionRequest, ContentPart, Inference};
use crate::media::{MediaConfig, MediaFetcher, VoiceHandling};
use crate::session::{BufferedItem, ItemKind};
use std::sync::Arc;
use std::time::Instant;

/// Completion text plus what the statistics row needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub metadata: ReplyMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMetadata {
    pub model: String,
    pub tokens: Option<u64>,
    pub response_time_ms: u64,
    pub used_media: bool,
}

/// A media item that could not be inlined. Carries the text part that
/// replaces it.
#[derive(Debug)]
struct DegradedMedia {
    placeholder: String,
}

#[derive(Debug, Clone)]
struct RequestSettings {
    model: String,
    temperature: f64,
    max_tokens: u32,
    multimodal_max_tokens: u32,
    transcription_model: String,
    transcription_language: String,
    voice_handling: VoiceHandling,
}

/// Builds the model request from a session buffer and runs it.
///
/// Sessions without resolvable media produce one plain-text user message.
/// Otherwise each image or voice item is fetched lazily and inlined next to
/// its caption; fetch failures fall back to a placeholder line.
pub struct ContextAssembler {
    inference: Arc<dyn Inference>,
    media: Arc<dyn MediaFetcher>,
    templates: PromptTemplates,
    formatter: TranscriptFormatter,
    settings: RequestSettings,
    locale: String,
}

impl ContextAssembler {
    pub fn new(
        inference: Arc<dyn Inference>,
        media: Arc<dyn MediaFetcher>,
        llm: &LlmConfig,
        media_config: &MediaConfig,
        prompt: &PromptConfig,
        locale: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let locale = locale.into();
        Ok(Self {
            inference,
            media,
            templates: PromptTemplates::new()?,
            formatter: TranscriptFormatter::new(prompt.utc_offset_minutes, locale.clone()),
            settings: RequestSettings {
                model: llm.model.clone(),
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
                multimodal_max_tokens: llm.multimodal_max_tokens,
                transcription_model: llm.transcription_model.clone(),
                transcription_language: llm.transcription_language.clone(),
                voice_handling: media_config.voice_handling,
            },
            locale,
        })
    }

    /// Whether `messages` will take the multimodal path.
    pub fn uses_media(messages: &[BufferedItem]) -> bool {
        messages.iter().any(BufferedItem::has_resolvable_media)
    }

    /// Assemble, call the model, and time the whole round trip. Inference
    /// errors are returned unchanged.
    pub async fn run(
        &self,
        messages: &[BufferedItem],
        instruction: &Instruction,
    ) -> anyhow::Result<AssistantReply> {
        let started = Instant::now();
        let request = self.build_request(messages, instruction).await?;
        // False when every attachment degraded to a placeholder.
        let used_media = request.has_media();

        let completion = self.inference.complete(&request).await?;

        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(AssistantReply {
            text: completion.text,
            metadata: ReplyMetadata {
                model: completion.model,
                tokens: completion.total_tokens,
                response_time_ms,
                used_media,
            },
        })
    }

    pub async fn build_request(
        &self,
        messages: &[BufferedItem],
        instruction: &Instruction,
    ) -> anyhow::Result<CompletionRequest> {
        let directive = instruction.directive(&self.locale);
        let locale = self.locale.as_str();

        if !Self::uses_media(messages) {
            let transcript = self.formatter.transcript(messages);
            let prompt = self
                .templates
                .render_text_prompt(locale, &transcript, &directive)?;
            return Ok(CompletionRequest {
                model: self.settings.model.clone(),
                messages: vec![
                    ChatMessage::system(t!("prompt.system_text", locale = locale)),
                    ChatMessage::user(prompt),
                ],
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            });
        }

        let mut parts = vec![ContentPart::text(t!("prompt.context_header", locale = locale))];
        for item in messages {
            match self.resolve_item(item).await {
                Ok(resolved) => parts.extend(resolved),
                Err(degraded) => parts.push(ContentPart::text(degraded.placeholder)),
            }
        }
        parts.push(ContentPart::text(
            self.templates.render_trailer(locale, &directive)?,
        ));

        Ok(CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(t!("prompt.system_media", locale = locale)),
                ChatMessage::user_parts(parts),
            ],
            max_tokens: self.settings.multimodal_max_tokens,
            temperature: self.settings.temperature,
        })
    }

    async fn resolve_item(&self, item: &BufferedItem) -> Result<Vec<ContentPart>, DegradedMedia> {
        let locale = self.locale.as_str();
        let prefix = self.formatter.prefix(item);
        let media = match (&item.media, item.kind) {
            (Some(media), ItemKind::Image | ItemKind::Voice) => media,
            _ => return Ok(vec![ContentPart::text(format!("{prefix}{}", item.text))]),
        };

        let degraded = |key: &str, error: &dyn std::fmt::Display| {
            tracing::warn!(
                file_id = %media.file_id,
                kind = %item.kind,
                "media unavailable, using placeholder: {error}"
            );
            DegradedMedia {
                placeholder: format!("{prefix}{}", t!(key, locale = locale)),
            }
        };

        if item.kind == ItemKind::Image {
            let image = self
                .media
                .fetch_inline_image(media)
                .await
                .map_err(|e| degraded("prompt.image_failed", &e))?;
            return Ok(vec![
                ContentPart::text(format!("{prefix}{}", t!("prompt.sent_image", locale = locale))),
                ContentPart::Image {
                    data_uri: image.data_uri,
                },
            ]);
        }

        let caption =
            ContentPart::text(format!("{prefix}{}", t!("prompt.sent_voice", locale = locale)));
        match self.settings.voice_handling {
            VoiceHandling::Inline => {
                let audio = self
                    .media
                    .fetch_inline_audio(media)
                    .await
                    .map_err(|e| degraded("prompt.voice_failed", &e))?;
                Ok(vec![
                    caption,
                    ContentPart::Audio {
                        data: audio.data,
                        format: audio.format,
                    },
                ])
            }
            VoiceHandling::Transcribe => {
                let bytes = self
                    .media
                    .fetch_bytes(&media.file_id)
                    .await
                    .map_err(|e| degraded("prompt.voice_failed", &e))?;
                let text = self
                    .inference
                    .transcribe(
                        &self.settings.transcription_model,
                        &bytes,
                        &self.settings.transcription_language,
                    )
                    .await
                    .map_err(|e| degraded("prompt.voice_failed", &e))?;
                Ok(vec![
                    caption,
                    ContentPart::text(t!("prompt.voice_transcript", locale = locale, text = text)),
                ])
            }
        }
    }
}
