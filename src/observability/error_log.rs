use crate::stats::{ErrorLogEntry, StatsStore};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Pending entries beyond this are dropped rather than blocking the logger.
pub const ERROR_LOG_CAPACITY: usize = 256;

/// Forwards `ERROR` events to the `logs` table through a bounded channel.
pub struct ErrorLogLayer {
    sender: mpsc::Sender<ErrorLogEntry>,
}

impl ErrorLogLayer {
    pub fn new(sender: mpsc::Sender<ErrorLogEntry>) -> Self {
        Self { sender }
    }

    /// Layer plus the receiving half for [`persist_error_logs`].
    pub fn channel() -> (Self, mpsc::Receiver<ErrorLogEntry>) {
        let (sender, receiver) = mpsc::channel(ERROR_LOG_CAPACITY);
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for ErrorLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR {
            return;
        }

        let mut fields = Map::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        fields.insert("target".into(), json!(metadata.target()));

        let entry = ErrorLogEntry {
            level: "error".into(),
            message,
            context: Value::Object(fields),
        };
        // Full or closed: the entry is dropped.
        let _ = self.sender.try_send(entry);
    }
}

struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().into(), json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().into(), json!(format!("{value:?}")));
    }
}

/// Drain `receiver` into `store` until every sender is gone. Write failures
/// are swallowed: an error log about the error log would loop.
pub async fn persist_error_logs(
    mut receiver: mpsc::Receiver<ErrorLogEntry>,
    store: Arc<dyn StatsStore>,
) {
    while let Some(entry) = receiver.recv().await {
        if let Err(e) = store.log_error(&entry).await {
            tracing::debug!("dropping error log entry: {e:#}");
        }
    }
}
