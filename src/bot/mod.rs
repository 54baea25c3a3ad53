mod commands;
pub mod replies;
mod router;

pub use commands::{help_text, menu};
pub use replies::CallbackAction;
pub use router::Router;
