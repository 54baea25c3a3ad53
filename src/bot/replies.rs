use crate::prompt::Preset;
use crate::transport::{Button, Keyboard};
use std::fmt;

/// Every callback payload the bot ever attaches to a button. Anything else
/// arriving in a callback query is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Analyze,
    Preset(Preset),
    Clear,
    Regenerate,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data.trim() {
            "analyze" => Some(Self::Analyze),
            "clear" => Some(Self::Clear),
            "regenerate" => Some(Self::Regenerate),
            other => other.parse().ok().map(Self::Preset),
        }
    }

    pub fn data(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Preset(Preset::Summary) => "summary",
            Self::Preset(Preset::Formal) => "formal",
            Self::Preset(Preset::Friendly) => "friendly",
            Self::Clear => "clear",
            Self::Regenerate => "regenerate",
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data())
    }
}

fn button(locale: &str, key: &str, action: CallbackAction) -> Button {
    Button::new(t!(key, locale = locale), action.data())
}

/// Attached to every progress message.
pub fn analyze_keyboard(locale: &str) -> Keyboard {
    Keyboard::single(button(locale, "buttons.analyze", CallbackAction::Analyze))
}

/// Shown after analyze: summary / formal + friendly / clear.
pub fn action_keyboard(locale: &str) -> Keyboard {
    Keyboard::single(button(locale, "buttons.summary", CallbackAction::Preset(Preset::Summary)))
        .row(vec![
            button(locale, "buttons.formal", CallbackAction::Preset(Preset::Formal)),
            button(locale, "buttons.friendly", CallbackAction::Preset(Preset::Friendly)),
        ])
        .row(vec![button(locale, "buttons.clear", CallbackAction::Clear)])
}

/// Attached to every model reply.
pub fn regenerate_keyboard(locale: &str) -> Keyboard {
    Keyboard::single(button(locale, "buttons.regenerate", CallbackAction::Regenerate))
}
