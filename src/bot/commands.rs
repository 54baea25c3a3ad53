use crate::transport::{BotCommand, Command};

/// Entries for the client's command menu. `/start` stays out of the menu.
pub fn menu(locale: &str) -> Vec<BotCommand> {
    [
        (Command::Analyze, "commands.analyze"),
        (Command::Clear, "commands.clear"),
        (Command::Help, "commands.help"),
    ]
    .into_iter()
    .map(|(command, key)| BotCommand {
        command: command.as_ref().to_string(),
        description: t!(key, locale = locale).into_owned(),
    })
    .collect()
}

pub fn help_text(locale: &str) -> String {
    t!("help.text", locale = locale).into_owned()
}
