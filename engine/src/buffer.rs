//! Per-key event buffers
//!
//! The [`BufferStore`] holds, for each active producer key, the ordered
//! events accumulated since that key's last flush plus the abort handle of
//! its pending idle timer. Entries live in striped shards so unrelated keys
//! never contend on one lock, and every mutation for a key happens under
//! its shard lock as one indivisible step: append, cancel the superseded
//! timer, then either drain at the size cap or report the generation a new
//! timer should be armed with.
//!
//! Generations are stamped from a store-wide monotonic counter, so a timer
//! armed for one buffer state can never match any other state — not even a
//! later entry re-created for the same key. A stale timer that fires simply
//! finds no matching generation and does nothing.

use nippu_core::{Event, ProducerKey};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::AbortHandle;

/// Shard count for the striped key → entry map. Bounds lock contention
/// between keys that hash to the same stripe.
const SHARD_COUNT: usize = 16;

/// Inline capacity for a key's buffered events. Bursts at the default
/// size cap of 10 stay close to inline.
type EventBuf = SmallVec<[Event; 8]>;

/// One producer key's buffered state
#[derive(Default)]
struct BufferEntry {
    events: EventBuf,
    /// Stamp of the append that last touched this entry. A timer only
    /// drains the entry while this still matches the stamp it was armed
    /// with.
    generation: u64,
    /// Abort handle of the pending idle timer, if one is armed
    timer: Option<AbortHandle>,
}

/// What an append decided
pub(crate) enum AppendOutcome {
    /// The size cap was reached: the entry was drained and removed, and
    /// these are its events in arrival order. Any pending timer was
    /// cancelled inside the same critical section.
    Full(Vec<Event>),
    /// The event was buffered; arm an idle timer carrying this generation.
    Pending { generation: u64 },
}

/// Striped per-key buffer map
pub(crate) struct BufferStore {
    shards: Vec<Mutex<HashMap<ProducerKey, BufferEntry>>>,
    generations: AtomicU64,
}

impl BufferStore {
    pub(crate) fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            generations: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: ProducerKey) -> &Mutex<HashMap<ProducerKey, BufferEntry>> {
        &self.shards[(key as u64 % SHARD_COUNT as u64) as usize]
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Append one event to its key's entry.
    ///
    /// Creates the entry on first event for an idle key. Cancels a pending
    /// timer in the same critical section, so the caller can arm a fresh
    /// one (on `Pending`) or skip timers entirely (on `Full`).
    pub(crate) fn append(&self, event: Event, max_batch: usize) -> AppendOutcome {
        let key = event.key;
        let generation = self.next_generation();

        let mut shard = self.shard(key).lock();
        let entry = shard.entry(key).or_default();
        entry.events.push(event);
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        entry.generation = generation;

        if entry.events.len() >= max_batch {
            let events = shard
                .remove(&key)
                .map(|entry| entry.events.into_vec())
                .unwrap_or_default();
            AppendOutcome::Full(events)
        } else {
            AppendOutcome::Pending { generation }
        }
    }

    /// Install the abort handle of a timer armed for `generation`.
    ///
    /// If the entry was drained or re-stamped between the append and this
    /// call, the timer is obsolete and gets aborted on the spot.
    pub(crate) fn install_timer(&self, key: ProducerKey, generation: u64, handle: AbortHandle) {
        let mut shard = self.shard(key).lock();
        match shard.get_mut(&key) {
            Some(entry) if entry.generation == generation => {
                entry.timer = Some(handle);
            }
            _ => handle.abort(),
        }
    }

    /// Drain the entry for `key` if its generation still matches.
    ///
    /// This is the timer-side flush. `None` means the entry was already
    /// drained or superseded; firing late is a safe no-op.
    pub(crate) fn drain_due(&self, key: ProducerKey, generation: u64) -> Option<Vec<Event>> {
        let mut shard = self.shard(key).lock();
        match shard.get(&key) {
            Some(entry) if entry.generation == generation => {
                // Dropping the entry drops its AbortHandle without
                // aborting: the firing timer is the task holding it.
                shard.remove(&key).map(|entry| entry.events.into_vec())
            }
            _ => None,
        }
    }

    /// Drain every entry, aborting pending timers. Shutdown path.
    pub(crate) fn drain_all(&self) -> Vec<(ProducerKey, Vec<Event>)> {
        let mut drained = Vec::new();
        for shard in &self.shards {
            let mut shard = shard.lock();
            for (key, mut entry) in shard.drain() {
                if let Some(timer) = entry.timer.take() {
                    timer.abort();
                }
                if !entry.events.is_empty() {
                    drained.push((key, entry.events.into_vec()));
                }
            }
        }
        drained
    }

    #[cfg(test)]
    pub(crate) fn pending_events(&self, key: ProducerKey) -> usize {
        self.shard(key)
            .lock()
            .get(&key)
            .map(|entry| entry.events.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn has_timer(&self, key: ProducerKey) -> bool {
        self.shard(key)
            .lock()
            .get(&key)
            .map(|entry| entry.timer.is_some())
            .unwrap_or(false)
    }
}
