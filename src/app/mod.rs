pub mod dispatch;
mod service;

pub use dispatch::dispatch;
pub use service::{Service, shutdown_signal};
