pub mod api;
mod convert;
mod handler;

use crate::config::TelegramConfig;
use crate::error::TransportError;
use crate::llm::scrub_secret_patterns;
use api::ApiResponse;
use serde::de::DeserializeOwned;
use std::time::Duration;


/// Extra time on top of the long-poll timeout before the HTTP client gives up.
const POLL_GRACE_SECS: u64 = 15;

fn connection_error(error: &reqwest::Error) -> TransportError {
    TransportError::Connection(scrub_secret_patterns(&error.to_string()).into_owned())
}

/// Telegram channel: long-polls the Bot API for updates.
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    allowed_users: Vec<String>,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self::with_options(bot_token, allowed_users, "https://api.telegram.org", 30)
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::with_options(
            config.bot_token.clone(),
            config.allowed_users.clone(),
            &config.api_base,
            config.poll_timeout_secs,
        )
    }

    fn with_options(
        bot_token: String,
        allowed_users: Vec<String>,
        api_base: &str,
        poll_timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(
                poll_timeout_secs.saturating_add(POLL_GRACE_SECS),
            ))
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!("telegram client falls back to defaults without timeouts: {error}");
                reqwest::Client::new()
            });
        Self {
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            allowed_users,
            poll_timeout_secs,
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    fn is_user_allowed(&self, identity: &str) -> bool {
        !identity.is_empty()
            && self
                .allowed_users
                .iter()
                .any(|allowed| allowed == "*" || allowed.trim_start_matches('@') == identity)
    }

    fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope. Telegram
    /// reports failures in the body, so the status code is not inspected.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(&e))?;

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            TransportError::Send(format!(
                "{method}: unreadable response: {}",
                scrub_secret_patterns(&e.to_string())
            ))
        })?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TransportError::Api {
                method: method.to_string(),
                description: description.unwrap_or_else(|| "missing result".to_string()),
            }),
        }
    }

    /// Download a file by id: `getFile`, then fetch the returned path.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file: api::File = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await?;
        let file_path = file.file_path.ok_or_else(|| TransportError::Api {
            method: "getFile".to_string(),
            description: format!("no file_path for {file_id}"),
        })?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| connection_error(&e))?;
        if !response.status().is_success() {
            return Err(TransportError::Send(format!(
                "file download failed ({})",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| connection_error(&e))?;
        Ok(bytes.to_vec())
    }
}
