//! Flush scheduling
//!
//! The [`FlushScheduler`] sits between event arrival and dispatch. Each
//! recorded event lands in the [`BufferStore`]; depending on the outcome it
//! either forwards a full batch straight to the dispatch channel or arms a
//! fresh idle timer for the key. Timers are plain spawned tasks that sleep
//! for the idle timeout and then try to drain their generation — the store
//! decides whether the fire is still current.

use crate::buffer::{AppendOutcome, BufferStore};
use crate::error::EngineError;
use nippu_core::{Event, ProducerKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A drained batch on its way to the dispatcher
pub(crate) struct FlushJob {
    pub key: ProducerKey,
    pub events: Vec<Event>,
}

/// Buffers events and decides when each key's batch is due
pub(crate) struct FlushScheduler {
    store: Arc<BufferStore>,
    jobs: mpsc::Sender<FlushJob>,
    idle_timeout: Duration,
    max_batch_size: usize,
}

impl FlushScheduler {
    pub(crate) fn new(
        store: Arc<BufferStore>,
        jobs: mpsc::Sender<FlushJob>,
        idle_timeout: Duration,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            jobs,
            idle_timeout,
            max_batch_size,
        }
    }

    /// Buffer one event, flushing immediately if it fills the batch.
    ///
    /// Awaits only when a full batch hits a saturated dispatch channel;
    /// the buffered path returns after arming the timer.
    pub(crate) async fn record(&self, event: Event) -> Result<(), EngineError> {
        let key = event.key;
        match self.store.append(event, self.max_batch_size) {
            AppendOutcome::Full(events) => {
                debug!(key, count = events.len(), "batch full, flushing");
                self.jobs
                    .send(FlushJob { key, events })
                    .await
                    .map_err(|_| EngineError::Shutdown("dispatch channel closed".into()))
            }
            AppendOutcome::Pending { generation } => {
                self.schedule_idle_flush(key, generation);
                Ok(())
            }
        }
    }

    /// Arm an idle timer for the given buffer generation.
    ///
    /// The timer holds its own channel sender, so the dispatch channel
    /// stays open until every pending timer has either fired or been
    /// aborted by a newer append.
    fn schedule_idle_flush(&self, key: ProducerKey, generation: u64) {
        let store = Arc::clone(&self.store);
        let jobs = self.jobs.clone();
        let idle = self.idle_timeout;

        let timer = tokio::spawn(async move {
            sleep(idle).await;
            let Some(events) = store.drain_due(key, generation) else {
                return;
            };
            debug!(key, count = events.len(), "idle timeout reached, flushing");
            if jobs.send(FlushJob { key, events }).await.is_err() {
                warn!(key, "dispatch channel closed, dropping idle flush");
            }
        });
        self.store.install_timer(key, generation, timer.abort_handle());
    }
}
