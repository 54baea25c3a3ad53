use super::types::{
    ChatRequest, ChatResponse, ContentPart, ImageUrlContent, InputAudioContent, Message,
    MessageContent, TranscriptionResponse,
};
use crate::error::LlmError;
use crate::llm::scrub::{api_error, scrub_secret_patterns};
use crate::llm::types::{self, ChatMessage, Completion, CompletionRequest, MessageBody};
use anyhow::Context;
use reqwest::StatusCode;

fn map_part(part: &types::ContentPart) -> ContentPart {
    match part {
        types::ContentPart::Text { text } => ContentPart::Text { text: text.clone() },
        types::ContentPart::Image { data_uri } => ContentPart::ImageUrl {
            image_url: ImageUrlContent {
                url: data_uri.clone(),
            },
        },
        types::ContentPart::Audio { data, format } => ContentPart::InputAudio {
            input_audio: InputAudioContent {
                data: data.clone(),
                format: format.clone(),
            },
        },
    }
}

fn map_message(message: &ChatMessage) -> Message {
    let role = match message.role {
        types::Role::System => "system",
        types::Role::User => "user",
        types::Role::Assistant => "assistant",
    };
    let content = match &message.body {
        MessageBody::Text(text) => MessageContent::Text(text.clone()),
        MessageBody::Parts(parts) => MessageContent::Parts(parts.iter().map(map_part).collect()),
    };
    Message { role, content }
}

pub(in crate::llm) fn build_request(request: &CompletionRequest) -> ChatRequest {
    ChatRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(map_message).collect(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

/// First choice's text plus usage. A missing or blank completion is an error:
/// the caller would otherwise send an empty reply.
pub(in crate::llm) fn extract_completion(
    chat_response: ChatResponse,
    provider_name: &str,
    requested_model: &str,
) -> anyhow::Result<Completion> {
    let text = chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| LlmError::EmptyResponse {
            provider: provider_name.to_string(),
        })?;

    Ok(Completion {
        text,
        total_tokens: chat_response.usage.as_ref().map(super::types::Usage::total),
        model: chat_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}

pub(in crate::llm) struct Endpoint<'a> {
    pub(in crate::llm) provider_name: &'a str,
    pub(in crate::llm) url: &'a str,
    pub(in crate::llm) timeout_secs: u64,
    pub(in crate::llm) extra_headers: &'a [(&'a str, &'a str)],
}

impl Endpoint<'_> {
    fn transport_error(&self, error: &reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            return LlmError::Timeout {
                provider: self.provider_name.to_string(),
                secs: self.timeout_secs,
            }
            .into();
        }
        LlmError::Request {
            provider: self.provider_name.to_string(),
            message: scrub_secret_patterns(&error.to_string()).into_owned(),
        }
        .into()
    }

    async fn check_status(&self, response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LlmError::Auth {
                provider: self.provider_name.to_string(),
            }
            .into()),
            _ => Err(api_error(self.provider_name, response).await),
        }
    }
}

fn require_auth<'h>(
    cached_auth_header: Option<&'h String>,
    provider_name: &str,
) -> anyhow::Result<&'h String> {
    cached_auth_header.ok_or_else(|| {
        LlmError::Auth {
            provider: provider_name.to_string(),
        }
        .into()
    })
}

pub(in crate::llm) async fn send_chat_completions_json(
    client: &reqwest::Client,
    cached_auth_header: Option<&String>,
    request: &ChatRequest,
    endpoint: Endpoint<'_>,
) -> anyhow::Result<ChatResponse> {
    let auth_header = require_auth(cached_auth_header, endpoint.provider_name)?;

    let mut request_builder = client
        .post(endpoint.url)
        .header("Authorization", auth_header)
        .json(request);
    for (name, value) in endpoint.extra_headers {
        request_builder = request_builder.header(*name, *value);
    }

    let response = request_builder
        .send()
        .await
        .map_err(|error| endpoint.transport_error(&error))?;
    let response = endpoint.check_status(response).await?;

    response
        .json()
        .await
        .with_context(|| format!("{} response JSON decode failed", endpoint.provider_name))
}

/// Multipart `audio/transcriptions` upload (`file`, `model`, `language`).
pub(in crate::llm) async fn send_transcription(
    client: &reqwest::Client,
    cached_auth_header: Option<&String>,
    audio: &[u8],
    model: &str,
    language: &str,
    endpoint: Endpoint<'_>,
) -> anyhow::Result<String> {
    let auth_header = require_auth(cached_auth_header, endpoint.provider_name)?;

    let file_part = reqwest::multipart::Part::bytes(audio.to_vec()).file_name("audio.ogg");
    let form = reqwest::multipart::Form::new()
        .part("file", file_part)
        .text("model", model.to_string())
        .text("language", language.to_string());

    let mut request_builder = client
        .post(endpoint.url)
        .header("Authorization", auth_header)
        .multipart(form);
    for (name, value) in endpoint.extra_headers {
        request_builder = request_builder.header(*name, *value);
    }

    let response = request_builder
        .send()
        .await
        .map_err(|error| endpoint.transport_error(&error))?;
    let response = endpoint.check_status(response).await?;

    let transcription: TranscriptionResponse = response
        .json()
        .await
        .with_context(|| format!("{} transcription JSON decode failed", endpoint.provider_name))?;
    Ok(transcription.text)
}
