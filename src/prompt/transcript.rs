use crate::session::BufferedItem;
use chrono::{DateTime, FixedOffset, Local};

/// Renders buffered items as `[HH:MM] <author>: <text>` lines.
#[derive(Debug, Clone)]
pub struct TranscriptFormatter {
    offset: Option<FixedOffset>,
    locale: String,
}

impl TranscriptFormatter {
    /// `utc_offset_minutes` of `None` (or out of range) uses the host zone.
    pub fn new(utc_offset_minutes: Option<i32>, locale: impl Into<String>) -> Self {
        Self {
            offset: utc_offset_minutes
                .and_then(|minutes| minutes.checked_mul(60))
                .and_then(FixedOffset::east_opt),
            locale: locale.into(),
        }
    }

    fn clock(&self, timestamp: i64) -> String {
        let Some(utc) = DateTime::from_timestamp(timestamp, 0) else {
            return "--:--".to_string();
        };
        match self.offset {
            Some(offset) => utc.with_timezone(&offset).format("%H:%M").to_string(),
            None => utc.with_timezone(&Local).format("%H:%M").to_string(),
        }
    }

    pub fn author_label(&self, item: &BufferedItem) -> String {
        if item.author.is_self {
            t!("prompt.self_label", locale = self.locale.as_str()).into_owned()
        } else {
            item.author.display_name.clone()
        }
    }

    /// `[HH:MM] <author>: `
    pub fn prefix(&self, item: &BufferedItem) -> String {
        format!("[{}] {}: ", self.clock(item.timestamp), self.author_label(item))
    }

    pub fn line(&self, item: &BufferedItem) -> String {
        format!("{}{}", self.prefix(item), item.text)
    }

    pub fn transcript(&self, items: &[BufferedItem]) -> String {
        items
            .iter()
            .map(|item| self.line(item))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
