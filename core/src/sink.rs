//! Sink traits for NIPPU
//!
//! The [`Deliverer`] trait is the outbound seam for batch delivery, and the
//! [`Notifier`] trait carries outcome reports back to producers. Together
//! they are the output side of the engine.

use crate::batch::BatchPayload;
use crate::error::SinkError;
use crate::event::{Category, ProducerKey};
use async_trait::async_trait;

/// Per-category delivery destination
///
/// Immutable for the process lifetime; loaded once at startup. The router
/// resolves each buffered category to its target, and the deliverer ships
/// payloads to the target's URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    /// Category this target accepts
    pub category: Category,
    /// Destination address for the category's batches
    pub url: String,
}

impl DeliveryTarget {
    /// Create a target for one category
    pub fn new(category: Category, url: impl Into<String>) -> Self {
        Self {
            category,
            url: url.into(),
        }
    }
}

/// Deliverer trait - ships a batch payload to its target
///
/// One deliverer instance serves every configured target; the target to
/// use arrives with each call. The engine wraps `deliver` in its own
/// deadline and makes exactly one attempt per payload, so implementations
/// must not retry internally.
///
/// # Implementation Requirements
///
/// - Deliverers must be `Send + Sync` for use across async tasks
/// - `deliver` should return once the target has acknowledged the payload
/// - Errors should pick the [`SinkError`] variant that matches the failure
///   mode: the engine classifies `Timeout` as a timeout outcome and
///   everything else as a transport failure
///
/// # Example
///
/// ```ignore
/// use nippu_core::{BatchPayload, Deliverer, DeliveryTarget, SinkError};
/// use async_trait::async_trait;
///
/// struct HttpDeliverer {
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl Deliverer for HttpDeliverer {
///     fn name(&self) -> &'static str {
///         "http"
///     }
///
///     async fn deliver(
///         &self,
///         target: &DeliveryTarget,
///         payload: &BatchPayload,
///     ) -> Result<(), SinkError> {
///         let response = self.client.post(target.url.as_str())
///             .json(payload)
///             .send()
///             .await
///             .map_err(|e| SinkError::Send(e.to_string()))?;
///
///         if response.status().is_success() {
///             Ok(())
///         } else {
///             Err(SinkError::Send(format!("status {}", response.status())))
///         }
///     }
///
///     async fn health(&self) -> bool {
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Returns the deliverer's name for identification and logging
    ///
    /// This should be a short, descriptive name that uniquely identifies
    /// the deliverer type. Examples: "webhook", "kafka", "s3".
    fn name(&self) -> &'static str;

    /// Deliver one batch payload to the given target
    ///
    /// # Arguments
    ///
    /// * `target` - The destination resolved for the payload's category
    /// * `payload` - The batch to ship; files are in arrival order
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The target acknowledged the batch
    /// * `Err(SinkError)` - The attempt failed; the variant drives outcome
    ///   classification
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &BatchPayload,
    ) -> Result<(), SinkError>;

    /// Check if the destination side is healthy and accepting batches
    ///
    /// Should be lightweight and not block for extended periods.
    async fn health(&self) -> bool;

    /// Graceful shutdown
    ///
    /// Called when the engine has drained. Implementations should flush
    /// pending requests and release held resources. The default returns
    /// `Ok(())` for deliverers that don't need cleanup.
    async fn shutdown(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Notifier trait - reports back to the producer identified by `key`
///
/// The engine formats the human-readable status line; implementations only
/// move it. Failures here are logged and swallowed by the engine — the
/// batch has already been processed regardless of whether the producer can
/// be reached — so implementations should not retry either.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the notifier's name for identification and logging
    fn name(&self) -> &'static str;

    /// Send a status line to the producer
    async fn send(&self, key: ProducerKey, text: &str) -> Result<(), SinkError>;
}
