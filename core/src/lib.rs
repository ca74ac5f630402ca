//! nippu-core - Core types for the NIPPU batching engine
//!
//! This crate provides the foundational types shared between the NIPPU
//! engine and external sink implementations (deliverers, notifiers):
//!
//! - [`Event`] - one inbound file-bearing message, tagged with producer key and category
//! - [`BatchPayload`] - the per-category delivery body built at flush time
//! - [`Deliverer`] trait - async interface for shipping a batch to its target
//! - [`Notifier`] trait - async interface for reporting outcomes back to a producer
//! - [`SinkError`] - error type for sink operations
//! - [`DeliveryOutcome`] - classification of a single delivery attempt
//!
//! # Why this crate exists
//!
//! Custom deliverers (say, a message-queue sink instead of webhooks) need to
//! implement [`Deliverer`] and consume [`BatchPayload`]. Without `nippu-core`
//! they would depend on `nippu-engine`, but the engine also wants to ship
//! stock sink implementations, which would create a cyclic dependency.
//!
//! By extracting the shared types here, the cycle breaks:
//!
//! ```text
//! nippu-core ◄── nippu-engine
//!     ▲
//!     └────────── your-deliverer
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

/// Batch payloads and delivery outcome classification
pub mod batch;
mod error;
/// Inbound events and their identity types
pub mod event;
mod sink;

pub use batch::{BatchPayload, DeliveryOutcome};
pub use error::SinkError;
pub use event::{Category, Event, EventId, FileDescriptor, ProducerKey};
pub use sink::{Deliverer, DeliveryTarget, Notifier};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    // ==========================================================================
    // SinkError Tests
    // ==========================================================================

    #[test]
    fn test_sink_error_init_display() {
        let err = SinkError::Init("tls backend unavailable".to_string());
        assert_eq!(
            err.to_string(),
            "initialization failed: tls backend unavailable"
        );
    }

    #[test]
    fn test_sink_error_send_display() {
        let err = SinkError::Send("unexpected status 500".to_string());
        assert_eq!(err.to_string(), "send failed: unexpected status 500");
    }

    #[test]
    fn test_sink_error_connection_display() {
        let err = SinkError::Connection("DNS lookup failed".to_string());
        assert_eq!(err.to_string(), "connection error: DNS lookup failed");
    }

    #[test]
    fn test_sink_error_timeout_display() {
        let err = SinkError::Timeout("deadline elapsed".to_string());
        assert_eq!(err.to_string(), "timed out: deadline elapsed");
    }

    #[test]
    fn test_sink_error_shutdown_display() {
        let err = SinkError::Shutdown("flush failed".to_string());
        assert_eq!(err.to_string(), "shutdown error: flush failed");
    }

    #[test]
    fn test_sink_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SinkError>();
    }

    // ==========================================================================
    // Deliverer Trait Tests
    // ==========================================================================

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Test deliverer that tracks calls for verification
    struct TestDeliverer {
        name: &'static str,
        deliver_count: AtomicU64,
        last_count: AtomicU64,
        healthy: AtomicBool,
        shutdown_called: AtomicBool,
    }

    impl TestDeliverer {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                deliver_count: AtomicU64::new(0),
                last_count: AtomicU64::new(0),
                healthy: AtomicBool::new(true),
                shutdown_called: AtomicBool::new(false),
            }
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::Relaxed);
        }
    }

    #[async_trait::async_trait]
    impl Deliverer for TestDeliverer {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn deliver(
            &self,
            _target: &DeliveryTarget,
            payload: &BatchPayload,
        ) -> Result<(), SinkError> {
            self.deliver_count.fetch_add(1, Ordering::Relaxed);
            self.last_count.store(payload.count as u64, Ordering::Relaxed);
            Ok(())
        }

        async fn health(&self) -> bool {
            self.healthy.load(Ordering::Relaxed)
        }

        async fn shutdown(&self) -> Result<(), SinkError> {
            self.shutdown_called.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn image_target() -> DeliveryTarget {
        DeliveryTarget::new(Category::Image, "http://localhost/hook")
    }

    fn image_payload(key: ProducerKey, n: usize) -> BatchPayload {
        let events: Vec<Event> = (0..n)
            .map(|i| {
                Event::new(
                    key,
                    Category::Image,
                    FileDescriptor::new(format!("file-{i}")),
                )
            })
            .collect();
        BatchPayload::new(key, Category::Image, events)
    }

    #[tokio::test]
    async fn test_deliverer_name() {
        let deliverer = TestDeliverer::new("test-deliverer");
        assert_eq!(deliverer.name(), "test-deliverer");
    }

    #[tokio::test]
    async fn test_deliverer_deliver_batch() {
        let deliverer = TestDeliverer::new("test");

        let result = deliverer.deliver(&image_target(), &image_payload(7, 5)).await;
        assert!(result.is_ok());
        assert_eq!(deliverer.deliver_count.load(Ordering::Relaxed), 1);
        assert_eq!(deliverer.last_count.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_deliverer_health_check() {
        let deliverer = TestDeliverer::new("test");

        assert!(deliverer.health().await);

        deliverer.set_healthy(false);
        assert!(!deliverer.health().await);

        deliverer.set_healthy(true);
        assert!(deliverer.health().await);
    }

    #[tokio::test]
    async fn test_deliverer_shutdown() {
        let deliverer = TestDeliverer::new("test");

        assert!(!deliverer.shutdown_called.load(Ordering::Relaxed));

        let result = deliverer.shutdown().await;
        assert!(result.is_ok());
        assert!(deliverer.shutdown_called.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_deliverer_is_object_safe() {
        // Verify trait is object-safe by using it as a trait object
        let deliverer: Arc<dyn Deliverer> = Arc::new(TestDeliverer::new("boxed"));

        assert_eq!(deliverer.name(), "boxed");
        assert!(deliverer.health().await);
        assert!(
            deliverer
                .deliver(&image_target(), &image_payload(1, 1))
                .await
                .is_ok()
        );
    }

    /// Deliverer that always fails - for testing error handling
    struct FailingDeliverer;

    #[async_trait::async_trait]
    impl Deliverer for FailingDeliverer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn deliver(
            &self,
            _target: &DeliveryTarget,
            _payload: &BatchPayload,
        ) -> Result<(), SinkError> {
            Err(SinkError::Send("always fails".to_string()))
        }

        async fn health(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_deliverer_returns_error() {
        let deliverer = FailingDeliverer;

        let result = deliverer.deliver(&image_target(), &image_payload(1, 1)).await;
        assert!(result.is_err());

        match result {
            Err(SinkError::Send(msg)) => assert_eq!(msg, "always fails"),
            _ => panic!("Expected SinkError::Send"),
        }
    }

    #[tokio::test]
    async fn test_deliverer_default_shutdown_succeeds() {
        // Not overriding shutdown - uses default
        struct MinimalDeliverer;

        #[async_trait::async_trait]
        impl Deliverer for MinimalDeliverer {
            fn name(&self) -> &'static str {
                "minimal"
            }
            async fn deliver(
                &self,
                _target: &DeliveryTarget,
                _payload: &BatchPayload,
            ) -> Result<(), SinkError> {
                Ok(())
            }
            async fn health(&self) -> bool {
                true
            }
        }

        let deliverer = MinimalDeliverer;
        assert!(deliverer.shutdown().await.is_ok());
    }

    // ==========================================================================
    // Notifier Trait Tests
    // ==========================================================================

    struct TestNotifier {
        sent: std::sync::Mutex<Vec<(ProducerKey, String)>>,
    }

    #[async_trait::async_trait]
    impl Notifier for TestNotifier {
        fn name(&self) -> &'static str {
            "test"
        }

        async fn send(&self, key: ProducerKey, text: &str) -> Result<(), SinkError> {
            self.sent.lock().unwrap().push((key, text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notifier_records_key_and_text() {
        let notifier = TestNotifier {
            sent: std::sync::Mutex::new(Vec::new()),
        };

        notifier.send(42, "Delivered 1 file.").await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert_eq!(sent[0].1, "Delivered 1 file.");
    }

    #[tokio::test]
    async fn test_notifier_is_object_safe() {
        let notifier: Arc<dyn Notifier> = Arc::new(TestNotifier {
            sent: std::sync::Mutex::new(Vec::new()),
        });
        assert_eq!(notifier.name(), "test");
        assert!(notifier.send(1, "hello").await.is_ok());
    }
}
