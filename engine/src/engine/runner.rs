//! Engine runner - drives flushed batches through dispatch
//!
//! Owns the receiving end of the flush channel and a join set of in-flight
//! dispatches. New batches are admitted only while fewer than
//! `max_inflight` dispatches are running; past that the loop stops
//! receiving, so under sustained overload jobs wait in the bounded flush
//! channel and flush-side sends park until a slot frees. The loop ends
//! when the channel closes, which happens only after every
//! [`EngineHandle`](super::EngineHandle) is gone and the last pending idle
//! timer has resolved, so a plain handle drop doubles as graceful
//! shutdown.

use crate::buffer::BufferStore;
use crate::dispatch::BatchDispatcher;
use crate::error::EngineError;
use crate::scheduler::FlushJob;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Engine runner - delivers flushed batches until shutdown
pub struct EngineRunner {
    jobs: mpsc::Receiver<FlushJob>,
    dispatcher: Arc<BatchDispatcher>,
    store: Arc<BufferStore>,
    max_inflight: usize,
}

impl std::fmt::Debug for EngineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRunner")
            .field("max_inflight", &self.max_inflight)
            .finish_non_exhaustive()
    }
}

impl EngineRunner {
    pub(super) fn new(
        jobs: mpsc::Receiver<FlushJob>,
        dispatcher: Arc<BatchDispatcher>,
        store: Arc<BufferStore>,
        max_inflight: usize,
    ) -> Self {
        Self {
            jobs,
            dispatcher,
            store,
            max_inflight,
        }
    }

    /// Run the dispatch loop until the flush channel closes.
    ///
    /// This will:
    /// 1. Receive flushed batches from the scheduler and its timers,
    ///    admitting at most `max_inflight` into dispatch at a time
    /// 2. Reap finished dispatches, freeing admission slots
    /// 3. On shutdown, flush anything still buffered before exiting
    pub async fn run(mut self) -> Result<(), EngineError> {
        info!("engine started");

        let mut dispatches: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                // Gated so a saturated engine backs up into the bounded
                // channel instead of this join set.
                job = self.jobs.recv(), if dispatches.len() < self.max_inflight => match job {
                    Some(job) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        dispatches.spawn(async move { dispatcher.dispatch(job).await });
                    }
                    None => break,
                },
                Some(joined) = dispatches.join_next(), if !dispatches.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "dispatch task failed");
                    }
                }
            }
        }

        // The channel only closes after all timers resolved, so anything
        // still buffered missed its flush. Deliver it rather than lose it.
        let leftovers = self.store.drain_all();
        if !leftovers.is_empty() {
            warn!(keys = leftovers.len(), "events still buffered at shutdown, flushing");
            for (key, events) in leftovers {
                let dispatcher = Arc::clone(&self.dispatcher);
                dispatches.spawn(async move {
                    dispatcher.dispatch(FlushJob { key, events }).await;
                });
            }
        }

        while let Some(joined) = dispatches.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "dispatch task failed");
            }
        }

        if let Err(e) = self.dispatcher.shutdown().await {
            warn!(error = %e, "deliverer shutdown failed");
        }
        info!("engine stopped");
        Ok(())
    }
}
