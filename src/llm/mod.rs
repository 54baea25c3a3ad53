// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod http_client;
pub mod scrub;
pub mod traits;
pub mod types;

// ── Provider implementations ────────────────────────────────────────────────
pub(crate) mod openai;
pub mod openrouter;

pub use http_client::build_provider_client_with_timeout;
pub use openrouter::OpenRouterProvider;
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::Inference;
pub use types::{ChatMessage, Completion, CompletionRequest, ContentPart, MessageBody, Role};
