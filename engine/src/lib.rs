//! NIPPU - Debounced batching and dispatch engine
//!
//! Groups rapid bursts of file-upload events from the same producer into a
//! single downstream delivery instead of firing one delivery per event.
//!
//! # Pipeline
//!
//! ```text
//! submit(event) ──► CategoryRouter ──rejected──► caller (synchronous)
//!                        │
//!                        ▼
//!               per-key BufferStore ◄── idle timer (cancel & reschedule)
//!                        │
//!                 flush (idle timeout or size cap)
//!                        │
//!                        ▼
//!                BatchDispatcher ──► one payload per category ──► targets
//!                        │
//!                        ▼
//!                    Notifier ──► producer
//! ```
//!
//! Buffers are best-effort and in-memory: they are lost on crash, and a
//! delivery gets exactly one attempt with a bounded timeout. Producers are
//! told how each category's batch fared so they can decide to resend.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

mod buffer;
pub mod config;
pub mod deliver;
mod dispatch;
pub mod engine;
pub mod error;
pub mod notify;
pub mod router;
mod scheduler;

pub use config::{Config, LogFormat};
pub use deliver::WebhookDeliverer;
pub use engine::{Engine, EngineHandle, EngineRunner};
pub use error::{EngineError, Result};
pub use notify::{HttpNotifier, LogNotifier};
pub use router::CategoryRouter;

// Re-export the core types callers need to submit events and implement sinks
pub use nippu_core::{
    BatchPayload, Category, Deliverer, DeliveryOutcome, DeliveryTarget, Event, EventId,
    FileDescriptor, Notifier, ProducerKey, SinkError,
};
