pub mod events;
pub mod telegram;
pub mod traits;

pub use events::{Command, ForwardOrigin, ForwardedMessage, InboundEvent};
pub use telegram::TelegramChannel;
pub use traits::{
    BotCommand, Button, CallbackNotice, ChatAction, EditError, Keyboard, MessageHandle, Messenger,
};
