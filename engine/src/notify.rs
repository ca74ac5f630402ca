//! Outcome notification
//!
//! Notifiers tell the producer behind a key what happened to its batch:
//! once when processing starts and once per delivered payload. They are
//! strictly best-effort — the dispatcher logs and swallows their errors, so
//! a broken notifier never changes a delivery outcome.
//!
//! [`LogNotifier`] writes the texts to the log and is the default.
//! [`HttpNotifier`] posts them to a configured webhook for an external
//! front-end to relay.

use crate::error::classify_http_error;
use async_trait::async_trait;
use nippu_core::{DeliveryOutcome, Notifier, ProducerKey, SinkError};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Text sent when a flushed batch starts processing.
pub(crate) fn processing_text(count: usize) -> String {
    format!("Processing {count} file{}...", plural(count))
}

/// Text sent for one delivered payload's outcome.
pub(crate) fn outcome_text(outcome: DeliveryOutcome, count: usize) -> String {
    let s = plural(count);
    match outcome {
        DeliveryOutcome::Success => format!("Delivered {count} file{s}."),
        DeliveryOutcome::Timeout => {
            format!("Delivery of {count} file{s} timed out. Please try again.")
        }
        DeliveryOutcome::TransportFailure => {
            format!("Delivery of {count} file{s} failed. Please try again.")
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Notifier that writes notification texts to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a new log notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, key: ProducerKey, text: &str) -> Result<(), SinkError> {
        info!(key, "{text}");
        Ok(())
    }
}

/// Notifier that posts `{key, text}` to a webhook
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    /// Build the notifier for the given webhook URL.
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SinkError::Init(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, key: ProducerKey, text: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.url.as_str())
            .json(&json!({ "key": key, "text": text }))
            .send()
            .await
            .map_err(classify_http_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Send(format!("unexpected status {status}")))
        }
    }
}
