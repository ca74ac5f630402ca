//! Batch dispatch
//!
//! A flushed batch may mix categories; the [`BatchDispatcher`] splits it
//! into one payload per category (first-seen order, arrival order kept
//! inside each group), resolves each category's delivery target, and
//! delivers the payloads concurrently under a global permit cap. Every
//! delivery gets exactly one attempt bounded by the delivery timeout, and
//! its outcome is reported to the notifier. Notification failures are
//! logged and swallowed; they never affect delivery outcomes.

use crate::error::EngineError;
use crate::notify::{outcome_text, processing_text};
use crate::router::CategoryRouter;
use crate::scheduler::FlushJob;
use nippu_core::{BatchPayload, Category, DeliveryOutcome, Deliverer, Event, Notifier, SinkError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Delivers flushed batches and reports outcomes
pub(crate) struct BatchDispatcher {
    router: Arc<CategoryRouter>,
    deliverer: Arc<dyn Deliverer>,
    notifier: Arc<dyn Notifier>,
    delivery_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl BatchDispatcher {
    pub(crate) fn new(
        router: Arc<CategoryRouter>,
        deliverer: Arc<dyn Deliverer>,
        notifier: Arc<dyn Notifier>,
        delivery_timeout: Duration,
        dispatch_concurrency: usize,
    ) -> Self {
        Self {
            router,
            deliverer,
            notifier,
            delivery_timeout,
            permits: Arc::new(Semaphore::new(dispatch_concurrency)),
        }
    }

    /// Deliver one flushed batch, one payload per category.
    ///
    /// Returns once every payload has been delivered (or timed out) and
    /// its outcome notification has been attempted.
    pub(crate) async fn dispatch(&self, job: FlushJob) {
        let key = job.key;

        // Events only reach a buffer through a routable submit, so a
        // missing target here is an invariant violation: log, skip the
        // group, keep delivering the rest.
        let mut groups = Vec::new();
        for (category, events) in partition_by_category(job.events) {
            match self.router.target(category) {
                Some(target) => groups.push((category, target.clone(), events)),
                None => {
                    let violation = EngineError::Invariant(format!(
                        "flushed events have no delivery target for category '{category}'"
                    ));
                    warn!(key, count = events.len(), error = %violation, "dropping group");
                }
            }
        }
        if groups.is_empty() {
            return;
        }

        let total: usize = groups.iter().map(|(_, _, events)| events.len()).sum();
        debug!(key, total, groups = groups.len(), "dispatching batch");
        if let Err(e) = self.notifier.send(key, &processing_text(total)).await {
            warn!(key, error = %e, "processing notification failed");
        }

        let mut deliveries = JoinSet::new();
        for (category, target, events) in groups {
            let deliverer = Arc::clone(&self.deliverer);
            let notifier = Arc::clone(&self.notifier);
            let permits = Arc::clone(&self.permits);
            let delivery_timeout = self.delivery_timeout;

            deliveries.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(key, category = %category, "dispatch permits closed, dropping batch");
                        return;
                    }
                };

                let payload = BatchPayload::new(key, category, events);
                let count = payload.count;
                let outcome =
                    match timeout(delivery_timeout, deliverer.deliver(&target, &payload)).await {
                        Ok(Ok(())) => DeliveryOutcome::Success,
                        Ok(Err(e)) => {
                            warn!(key, category = %category, error = %e, "delivery failed");
                            classify_sink_error(&e)
                        }
                        Err(_) => {
                            warn!(
                                key,
                                category = %category,
                                timeout_ms = delivery_timeout.as_millis() as u64,
                                "delivery timed out"
                            );
                            DeliveryOutcome::Timeout
                        }
                    };

                info!(
                    key,
                    category = %category,
                    count,
                    outcome = outcome.as_str(),
                    "delivery finished"
                );
                if let Err(e) = notifier.send(key, &outcome_text(outcome, count)).await {
                    warn!(key, error = %e, "outcome notification failed");
                }
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            if let Err(e) = joined {
                warn!(key, error = %e, "delivery task failed");
            }
        }
    }

    pub(crate) async fn shutdown(&self) -> Result<(), SinkError> {
        self.deliverer.shutdown().await
    }
}

/// Split a batch into per-category groups.
///
/// Groups appear in the order their category was first seen, and events
/// keep their arrival order within each group.
fn partition_by_category(events: Vec<Event>) -> Vec<(Category, Vec<Event>)> {
    let mut groups: Vec<(Category, Vec<Event>)> = Vec::new();
    for event in events {
        match groups.iter_mut().find(|(category, _)| *category == event.category) {
            Some((_, group)) => group.push(event),
            None => groups.push((event.category, vec![event])),
        }
    }
    groups
}

/// Map a delivery error onto the reported outcome.
fn classify_sink_error(error: &SinkError) -> DeliveryOutcome {
    match error {
        SinkError::Timeout(_) => DeliveryOutcome::Timeout,
        _ => DeliveryOutcome::TransportFailure,
    }
}
