use super::Config;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }

        if let Some(key) = non_empty_var("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }

        if let Some(model) = non_empty_var("UNIFIED_MODEL") {
            self.llm.model = model;
        }

        if let Some(model) = non_empty_var("VOICE_MODEL") {
            self.llm.transcription_model = model;
        }

        if let Some(url) = non_empty_var("DATABASE_URL") {
            self.storage.database_url = url;
        }

        if let Some(level) = non_empty_var("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }

        if let Some(locale) = non_empty_var("CONTEXT_ASSISTANT_LOCALE") {
            self.locale = locale;
        }
    }
}
