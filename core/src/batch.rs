//! Batch payloads and delivery outcomes
//!
//! A [`BatchPayload`] is built per category, per flush: it carries every
//! file a producer buffered for that category, in arrival order, plus the
//! flush timestamp. Payloads are transient — constructed for one delivery
//! attempt and discarded after it, whatever the outcome.

use crate::event::{Category, Event, FileDescriptor, ProducerKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The delivery body for one category's share of a flush
///
/// Serialized as JSON and POSTed to the category's target. Events for
/// distinct producer keys never share a payload.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPayload {
    /// Producer the batch belongs to
    pub key: ProducerKey,
    /// Category every file in this payload shares
    pub category: Category,
    /// Number of files in the payload
    pub count: usize,
    /// When the flush that produced this payload fired
    pub flushed_at: DateTime<Utc>,
    /// File descriptors in arrival order
    pub files: Vec<FileDescriptor>,
}

impl BatchPayload {
    /// Build a payload from drained events, consuming them.
    ///
    /// Callers pass events of a single category for a single key; the
    /// payload keeps their arrival order.
    pub fn new(key: ProducerKey, category: Category, events: Vec<Event>) -> Self {
        let files: Vec<FileDescriptor> = events.into_iter().map(|event| event.file).collect();
        Self {
            key,
            category,
            count: files.len(),
            flushed_at: Utc::now(),
            files,
        }
    }
}

/// Classification of a single delivery attempt
///
/// Selects the notification message sent back to the producer; not
/// persisted anywhere. The engine makes exactly one attempt per payload,
/// so there is no retried-then-succeeded state to represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The target acknowledged the batch
    Success,
    /// The attempt exceeded the configured deadline
    Timeout,
    /// Connection or protocol error, or a non-success response
    TransportFailure,
}

impl DeliveryOutcome {
    /// Lowercase name for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success => "success",
            DeliveryOutcome::Timeout => "timeout",
            DeliveryOutcome::TransportFailure => "transport_failure",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
