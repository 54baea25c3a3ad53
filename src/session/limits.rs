use super::types::{BufferedItem, ItemKind, Session};
use crate::config::LimitsConfig;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Which admission limit rejected a candidate item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LimitKind {
    MaxMessages,
    MaxImages,
    MaxVoice,
    VoiceTooLong,
}

/// Admission control for the per-user buffer. Pure: never touches storage.
#[derive(Debug, Clone)]
pub struct LimitsValidator {
    limits: LimitsConfig,
    locale: String,
}

impl LimitsValidator {
    pub fn new(limits: LimitsConfig, locale: impl Into<String>) -> Self {
        Self {
            limits,
            locale: locale.into(),
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Checks run in a fixed order and the first failure wins.
    pub fn validate_new_message(
        &self,
        session: &Session,
        candidate: &BufferedItem,
    ) -> Result<(), LimitKind> {
        let stats = session.stats();

        if stats.total_messages >= self.limits.max_messages {
            return Err(LimitKind::MaxMessages);
        }

        match candidate.kind {
            ItemKind::Image if stats.image_count >= self.limits.max_images => {
                Err(LimitKind::MaxImages)
            }
            ItemKind::Voice => {
                if stats.voice_count >= self.limits.max_voice {
                    return Err(LimitKind::MaxVoice);
                }
                let duration = candidate.voice_duration().unwrap_or(0);
                if duration > self.limits.max_voice_duration_secs {
                    return Err(LimitKind::VoiceTooLong);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Localized rejection text for `kind`.
    pub fn reason(&self, kind: LimitKind) -> String {
        let locale = self.locale.as_str();
        match kind {
            LimitKind::MaxMessages => {
                t!("limits.max_messages", locale = locale, max = self.limits.max_messages)
            }
            LimitKind::MaxImages => {
                t!("limits.max_images", locale = locale, max = self.limits.max_images)
            }
            LimitKind::MaxVoice => {
                t!("limits.max_voice", locale = locale, max = self.limits.max_voice)
            }
            LimitKind::VoiceTooLong => t!(
                "limits.voice_too_long",
                locale = locale,
                max = self.limits.max_voice_duration_secs
            ),
        }
        .into_owned()
    }

    /// `📝 Накоплено: 3/50 сообщений, 1/5 изображений` plus the analyze hint
    /// once anything is buffered. Sub-counts appear only when non-zero.
    pub fn format_progress_message(&self, session: &Session) -> String {
        let locale = self.locale.as_str();
        let stats = session.stats();

        let mut parts = vec![
            t!(
                "progress.collected",
                locale = locale,
                total = stats.total_messages,
                max = self.limits.max_messages
            )
            .into_owned(),
        ];
        if stats.image_count > 0 {
            parts.push(
                t!(
                    "progress.images",
                    locale = locale,
                    count = stats.image_count,
                    max = self.limits.max_images
                )
                .into_owned(),
            );
        }
        if stats.voice_count > 0 {
            parts.push(
                t!(
                    "progress.voice",
                    locale = locale,
                    count = stats.voice_count,
                    max = self.limits.max_voice
                )
                .into_owned(),
            );
        }

        let mut message = parts.join(", ");
        if stats.total_messages >= 1 {
            message.push('\n');
            message.push_str(&t!("progress.hint", locale = locale));
        }
        message
    }
}
