use super::types::UserId;
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;
type LaneMap = HashMap<UserId, mpsc::UnboundedSender<Job>>;

/// Per-user FIFO executor.
///
/// Every user gets a single-consumer queue drained by one spawned worker, so
/// tasks for the same user run one at a time in submission order while
/// different users proceed concurrently. A worker removes its queue from the
/// map when it runs dry; both the enqueue and that removal happen under the
/// map lock, so no job can be stranded in a queue nobody drains.
#[derive(Clone, Default)]
pub struct SerialLanes {
    lanes: Arc<Mutex<LaneMap>>,
}

/// Completion handle returned by [`SerialLanes::submit`].
///
/// Resolves to the task's own result, or to an error if the task panicked.
/// Dropping the ticket does not cancel the task.
pub struct LaneTicket<T> {
    receiver: oneshot::Receiver<anyhow::Result<T>>,
}

impl<T> Future for LaneTicket<T> {
    type Output = anyhow::Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| Err(anyhow::anyhow!("lane worker dropped the task")))
        })
    }
}

fn lock(lanes: &Mutex<LaneMap>) -> MutexGuard<'_, LaneMap> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".into()
    }
}

impl SerialLanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` behind every earlier task for `user_id`.
    pub fn submit<F, T>(&self, user_id: UserId, task: F) -> LaneTicket<T>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, receiver) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => {
                    tracing::warn!(user_id = %user_id, "lane task failed: {error:#}");
                    Err(error)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(user_id = %user_id, panic = %message, "lane task panicked");
                    Err(anyhow::anyhow!("lane task panicked: {message}"))
                }
            };
            // The submitter may have stopped waiting.
            let _ = result_tx.send(outcome);
        });

        let mut lanes = lock(&self.lanes);
        let job = match lanes.get(&user_id) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return LaneTicket { receiver },
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (sender, queue) = mpsc::unbounded_channel();
        if sender.send(job).is_ok() {
            lanes.insert(user_id, sender);
            tokio::spawn(drain(user_id, queue, Arc::clone(&self.lanes)));
        }
        LaneTicket { receiver }
    }

    /// Number of users with queued or running work.
    pub fn active_lanes(&self) -> usize {
        lock(&self.lanes).len()
    }

    /// Wait until every lane has drained, or `timeout` elapses. Returns
    /// whether the lanes went idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active_lanes() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

async fn drain(
    user_id: UserId,
    mut queue: mpsc::UnboundedReceiver<Job>,
    lanes: Arc<Mutex<LaneMap>>,
) {
    loop {
        let next = match queue.try_recv() {
            Ok(job) => Some(job),
            Err(_) => {
                let mut map = lock(&lanes);
                match queue.try_recv() {
                    Ok(job) => Some(job),
                    Err(_) => {
                        map.remove(&user_id);
                        None
                    }
                }
            }
        };
        match next {
            Some(job) => job.await,
            None => {
                tracing::trace!(user_id = %user_id, "lane idle, released");
                return;
            }
        }
    }
}
