//! Webhook delivery
//!
//! [`WebhookDeliverer`] posts batch payloads as JSON to the target URL of
//! each category. It only sets a connect timeout on the HTTP client; total
//! request time is bounded by the dispatcher's delivery timeout, and the
//! dispatcher also owns the single-attempt policy, so there is no retry
//! here.

use crate::error::classify_http_error;
use async_trait::async_trait;
use nippu_core::{BatchPayload, Deliverer, DeliveryTarget, SinkError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Posts batch payloads to per-category webhook URLs
pub struct WebhookDeliverer {
    client: reqwest::Client,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl WebhookDeliverer {
    /// Build the deliverer with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SinkError::Init(e.to_string()))?;
        Ok(Self {
            client,
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    /// Number of payloads accepted by a webhook (2xx responses)
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of payloads that failed to deliver
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Deliverer for WebhookDeliverer {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &BatchPayload,
    ) -> Result<(), SinkError> {
        let response = self
            .client
            .post(target.url.as_str())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                self.failed.fetch_add(1, Ordering::Relaxed);
                classify_http_error(e)
            })?;

        let status = response.status();
        if status.is_success() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
            debug!(
                key = payload.key,
                category = %payload.category,
                count = payload.count,
                status = status.as_u16(),
                "payload posted"
            );
            Ok(())
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            Err(SinkError::Send(format!("unexpected status {status}")))
        }
    }

    async fn health(&self) -> bool {
        true
    }
}
