use reqwest::Client;
use std::time::Duration;

/// Shared client for model calls. `timeout_secs` bounds the whole request,
/// including reading the completion body.
pub fn build_provider_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!("falling back to default HTTP client: {error}");
            Client::new()
        })
}
