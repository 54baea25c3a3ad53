use super::Config;

/// Normalise `"ru_RU.UTF-8"` -> `"ru"`, `"en_US"` -> `"en"`, passthrough `"ru"`.
fn normalise_locale(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    let lang = base.split('_').next().unwrap_or(base);
    lang.trim().to_lowercase()
}

impl Config {
    /// Locale used for user-facing replies. Unknown locales fall back to `ru`.
    pub fn effective_locale(&self) -> String {
        let locale = normalise_locale(&self.locale);
        let known = rust_i18n::available_locales!();
        if known.iter().any(|candidate| *candidate == locale) {
            locale
        } else {
            "ru".into()
        }
    }

    /// Set the process-wide default locale for `t!` calls without an explicit locale.
    pub fn apply_locale(&self) {
        rust_i18n::set_locale(&self.effective_locale());
    }
}
