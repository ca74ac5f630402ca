//! Inbound events for NIPPU
//!
//! An [`Event`] is one file-bearing message from a producer. Events are
//! immutable once constructed: the engine appends them to a per-key buffer
//! and moves them, unchanged, into a [`BatchPayload`](crate::BatchPayload)
//! at flush time. Insertion order is significant — it determines the order
//! of files inside the delivered batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an event producer (a user id), used to group buffering.
pub type ProducerKey = i64;

/// Compact event identifier (a ULID in binary form)
///
/// Implements Display for string formatting; generated at construction,
/// never parsed back from the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(ulid::Ulid);

impl EventId {
    /// Generate a new unique ID
    #[inline]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the underlying ULID
    #[inline]
    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of an event, determining its delivery target.
///
/// Each configured category has exactly one target; events in a category
/// with no target are rejected at submission and never buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Photos and other still images
    Image,
    /// Video files
    Video,
    /// Everything else shipped as a document attachment
    Document,
}

impl Category {
    /// All categories, in declaration order
    pub const ALL: [Category; 3] = [Category::Image, Category::Video, Category::Document];

    /// Lowercase wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Document => "document",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque payload data carried by an event
///
/// Everything the delivery target needs to fetch or identify the file:
/// the producer-side file id, optional display name and size, and a
/// pre-generated download URL when the source exposes one. Serialized
/// verbatim into the batch payload, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Source-side identifier of the file
    pub file_id: String,
    /// Display name, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Size in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Pre-generated download URL, when the source exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl FileDescriptor {
    /// Create a descriptor with only the file id set
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: None,
            size_bytes: None,
            download_url: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the size in bytes
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Set the download URL
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }
}

/// One inbound file-bearing message
///
/// Owned exclusively by the buffer entry it is appended to until a flush
/// consumes it. The arrival timestamp is recorded at construction; buffer
/// ordering uses insertion order, not the timestamp.
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique id, generated at construction
    pub id: EventId,
    /// Producer this event belongs to
    pub key: ProducerKey,
    /// Category selecting the delivery target
    pub category: Category,
    /// Opaque file payload
    pub file: FileDescriptor,
    /// When the engine received the event
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Create a new event, stamping id and arrival time
    pub fn new(key: ProducerKey, category: Category, file: FileDescriptor) -> Self {
        Self {
            id: EventId::new(),
            key,
            category,
            file,
            received_at: Utc::now(),
        }
    }
}
