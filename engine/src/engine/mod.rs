//! Engine - the batching pipeline builder for NIPPU
//!
//! The Engine provides a builder pattern for wiring the debounce pipeline.
//! No YAML, just code.
//!
//! # Example
//!
//! ```ignore
//! use nippu_engine::{Category, Engine, Event, FileDescriptor, WebhookDeliverer};
//! use std::time::Duration;
//!
//! let (handle, runner) = Engine::new()
//!     .target(Category::Image, "http://localhost:9000/hooks/image")
//!     .deliverer(WebhookDeliverer::new(Duration::from_secs(10))?)
//!     .build()?;
//! tokio::spawn(runner.run());
//!
//! let event = Event::new(42, Category::Image, FileDescriptor::new("file-1"));
//! handle.submit(event).await?;
//! ```
//!
//! [`Engine::build`] hands back two halves: a cheap-to-clone
//! [`EngineHandle`] for submitting events and an [`EngineRunner`] that owns
//! the dispatch loop. The runner stops once every handle is dropped and the
//! last pending flush has drained.

mod runner;

pub use runner::EngineRunner;

use crate::buffer::BufferStore;
use crate::config::{
    Config, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DELIVERY_TIMEOUT, DEFAULT_DISPATCH_CONCURRENCY,
    DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_BATCH_SIZE,
};
use crate::dispatch::BatchDispatcher;
use crate::error::EngineError;
use crate::notify::LogNotifier;
use crate::router::CategoryRouter;
use crate::scheduler::FlushScheduler;
use nippu_core::{Category, Deliverer, DeliveryTarget, Event, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builder for the batching pipeline
///
/// # Architecture
///
/// ```text
/// submit ──► router ──► per-key buffers ──► flush jobs ──► dispatcher ──► deliverer
///                           ▲    │                              │
///                      idle timers                          notifier
/// ```
pub struct Engine {
    targets: Vec<DeliveryTarget>,
    idle_timeout: Duration,
    max_batch_size: usize,
    delivery_timeout: Duration,
    dispatch_concurrency: usize,
    channel_capacity: usize,
    deliverer: Option<Arc<dyn Deliverer>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Engine {
    /// Create a new Engine with default settings
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            deliverer: None,
            notifier: None,
        }
    }

    /// Seed the builder from loaded configuration.
    ///
    /// Takes over the targets and tuning knobs; the deliverer and notifier
    /// still have to be wired by the caller.
    pub fn from_config(config: &Config) -> Self {
        let mut engine = Self::new();
        engine.targets = config.targets.clone();
        engine.idle_timeout = config.idle_timeout;
        engine.max_batch_size = config.max_batch_size;
        engine.delivery_timeout = config.delivery_timeout;
        engine.dispatch_concurrency = config.dispatch_concurrency;
        engine.channel_capacity = config.channel_capacity;
        engine
    }

    /// Add a delivery target for a category
    ///
    /// Events whose category has no target are rejected at submit.
    pub fn target(mut self, category: Category, url: impl Into<String>) -> Self {
        self.targets.push(DeliveryTarget::new(category, url));
        self
    }

    /// Set the idle timeout
    ///
    /// A key's buffer flushes once this long passes without a new event.
    /// Default is 3 seconds.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the batch size that triggers an immediate flush
    ///
    /// Default is 10 events.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set the upper bound on a single delivery attempt
    ///
    /// Default is 15 seconds.
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the maximum payload deliveries in flight at once
    ///
    /// Also the number of flushed batches the runner admits at a time;
    /// past it, jobs wait in the flush channel. Default is 8.
    pub fn dispatch_concurrency(mut self, concurrency: usize) -> Self {
        self.dispatch_concurrency = concurrency;
        self
    }

    /// Set the flush → dispatch channel capacity
    ///
    /// This is the backpressure point between flushing and delivery.
    /// Default is 1,024 jobs.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the deliverer that posts batch payloads
    pub fn deliverer<D: Deliverer + 'static>(mut self, deliverer: D) -> Self {
        self.deliverer = Some(Arc::new(deliverer));
        self
    }

    /// Set the deliverer (Arc version)
    pub fn deliverer_arc(mut self, deliverer: Arc<dyn Deliverer>) -> Self {
        self.deliverer = Some(deliverer);
        self
    }

    /// Set the notifier for batch outcomes
    ///
    /// Defaults to [`LogNotifier`] when unset.
    pub fn notifier<N: Notifier + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Set the notifier (Arc version)
    pub fn notifier_arc(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Wire the pipeline.
    ///
    /// Returns the submitting handle and the runner that owns the dispatch
    /// loop. Fails when no deliverer or no target is configured, or when a
    /// tuning knob is set to an unusable zero.
    pub fn build(self) -> Result<(EngineHandle, EngineRunner), EngineError> {
        let deliverer = self
            .deliverer
            .ok_or_else(|| EngineError::Config("no deliverer configured".to_string()))?;
        if self.targets.is_empty() {
            return Err(EngineError::Config(
                "no delivery targets configured".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(EngineError::Config(
                "max batch size must be at least 1".to_string(),
            ));
        }
        if self.dispatch_concurrency == 0 {
            return Err(EngineError::Config(
                "dispatch concurrency must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(EngineError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier::new()));

        let router = Arc::new(CategoryRouter::new(self.targets));
        let store = Arc::new(BufferStore::new());
        let (jobs_tx, jobs_rx) = mpsc::channel(self.channel_capacity);
        let scheduler = Arc::new(FlushScheduler::new(
            Arc::clone(&store),
            jobs_tx,
            self.idle_timeout,
            self.max_batch_size,
        ));
        let dispatcher = Arc::new(BatchDispatcher::new(
            Arc::clone(&router),
            deliverer,
            notifier,
            self.delivery_timeout,
            self.dispatch_concurrency,
        ));

        let handle = EngineHandle { router, scheduler };
        let runner = EngineRunner::new(jobs_rx, dispatcher, store, self.dispatch_concurrency);
        Ok((handle, runner))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for submitting events into the pipeline
///
/// Cloning is cheap; every clone feeds the same buffers. The runner shuts
/// down once all handles are dropped and pending flushes have drained.
#[derive(Clone)]
pub struct EngineHandle {
    router: Arc<CategoryRouter>,
    scheduler: Arc<FlushScheduler>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Submit one event.
    ///
    /// Rejects synchronously when the event's category has no delivery
    /// target; a rejected event is never buffered. Accepted events are
    /// buffered under their key and flushed on idle timeout or at the
    /// size cap.
    pub async fn submit(&self, event: Event) -> Result<(), EngineError> {
        self.router.route(event.category)?;
        self.scheduler.record(event).await
    }

    /// Categories this engine accepts, in declaration order
    pub fn categories(&self) -> Vec<Category> {
        self.router.categories().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nippu_core::{BatchPayload, FileDescriptor, SinkError};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingDeliverer {
        calls: Arc<AtomicU64>,
    }

    #[async_trait]
    impl Deliverer for CountingDeliverer {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(
            &self,
            _target: &DeliveryTarget,
            _payload: &BatchPayload,
        ) -> Result<(), SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn counting_engine() -> (Engine, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let engine = Engine::new()
            .target(Category::Image, "http://localhost/hooks/image")
            .deliverer(CountingDeliverer {
                calls: calls.clone(),
            });
        (engine, calls)
    }

    #[test]
    fn test_build_requires_a_deliverer() {
        let err = Engine::new()
            .target(Category::Image, "http://localhost/hooks/image")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Config("no deliverer configured".to_string())
        );
    }

    #[test]
    fn test_build_requires_a_target() {
        let calls = Arc::new(AtomicU64::new(0));
        let err = Engine::new()
            .deliverer(CountingDeliverer { calls })
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Config("no delivery targets configured".to_string())
        );
    }

    #[test]
    fn test_build_rejects_zero_knobs() {
        let (engine, _) = counting_engine();
        assert!(engine.max_batch_size(0).build().is_err());

        let (engine, _) = counting_engine();
        assert!(engine.dispatch_concurrency(0).build().is_err());

        let (engine, _) = counting_engine();
        assert!(engine.channel_capacity(0).build().is_err());
    }

    #[tokio::test]
    async fn test_submit_rejects_unconfigured_category() {
        let (engine, calls) = counting_engine();
        let (handle, runner) = engine.build().unwrap();
        let running = tokio::spawn(runner.run());

        let event = Event::new(7, Category::Video, FileDescriptor::new("clip"));
        let err = handle.submit(event).await.unwrap_err();
        assert_eq!(err, EngineError::Rejected(Category::Video));

        drop(handle);
        running.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0, "nothing was buffered");
    }

    #[tokio::test]
    async fn test_handle_reports_categories() {
        let calls = Arc::new(AtomicU64::new(0));
        let (handle, runner) = Engine::new()
            .target(Category::Video, "http://localhost/hooks/video")
            .target(Category::Image, "http://localhost/hooks/image")
            .deliverer(CountingDeliverer { calls })
            .build()
            .unwrap();
        let running = tokio::spawn(runner.run());

        // Declaration order, regardless of insertion order
        assert_eq!(
            handle.categories(),
            vec![Category::Image, Category::Video]
        );

        drop(handle);
        running.await.unwrap().unwrap();
    }
}
