//! Ringbuffer module for retaining the most recent captured records.
//!
//! This module provides a fixed-capacity, thread-safe circular store with
//! predictable memory usage. Once full, the oldest record is overwritten.
//! Every insertion is announced to registered listeners after the store lock
//! has been released.

use crate::error::StoreError;
use crate::record::SharedRecord;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::trace;

/// Default number of retained records.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Callback invoked with each newly inserted batch.
pub type BatchListener = Arc<dyn Fn(&[SharedRecord]) + Send + Sync>;

/// Handle returned by [`LogStore::on_batch`], used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Point-in-time view of the store counters.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub capacity: usize,
    pub count: usize,
    pub total_count: u64,
}

struct Ring {
    slots: Vec<Option<SharedRecord>>,
    /// Next write position; also the oldest record once the ring has wrapped.
    head: usize,
    total_count: u64,
}

impl Ring {
    fn count(&self) -> usize {
        self.total_count.min(self.slots.len() as u64) as usize
    }

    fn push(&mut self, record: SharedRecord) {
        let capacity = self.slots.len();
        self.slots[self.head] = Some(record);
        self.head = (self.head + 1) % capacity;
        self.total_count += 1;
    }

    /// Returns all retained records, oldest to newest.
    fn ordered(&self) -> Vec<SharedRecord> {
        let count = self.count();
        let mut result = Vec::with_capacity(count);

        if self.total_count <= self.slots.len() as u64 {
            // Not yet wrapped, records sit in order from 0 to count-1
            result.extend(self.slots[..count].iter().flatten().cloned());
        } else {
            // Wrapped: oldest is at head, continue from 0 up to head
            result.extend(self.slots[self.head..].iter().flatten().cloned());
            result.extend(self.slots[..self.head].iter().flatten().cloned());
        }

        result
    }

    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.total_count = 0;
    }
}

/// A circular, thread-safe store of captured records.
pub struct LogStore {
    ring: Mutex<Ring>,
    capacity: usize,
    listeners: RwLock<Vec<(ListenerId, BatchListener)>>,
    next_listener: AtomicU64,
}

impl LogStore {
    /// Creates a new store with the specified capacity.
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        if capacity == 0 {
            return Err(StoreError::ZeroCapacity);
        }

        Ok(Self {
            ring: Mutex::new(Ring {
                slots: vec![None; capacity],
                head: 0,
                total_count: 0,
            }),
            capacity,
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        })
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the maximum capacity of the store.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of records currently retained.
    pub fn count(&self) -> usize {
        self.ring().count()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Returns the number of records ever inserted, including overwritten ones.
    pub fn total_count(&self) -> u64 {
        self.ring().total_count
    }

    pub fn stats(&self) -> StoreStats {
        let ring = self.ring();
        StoreStats {
            capacity: self.capacity,
            count: ring.count(),
            total_count: ring.total_count,
        }
    }

    /// Appends a single record, overwriting the oldest when full.
    pub fn add(&self, record: impl Into<SharedRecord>) {
        let record = record.into();
        self.ring().push(Arc::clone(&record));
        self.notify(std::slice::from_ref(&record));
    }

    /// Appends a batch under one lock acquisition.
    pub fn add_range(&self, records: &[SharedRecord]) {
        if records.is_empty() {
            return;
        }

        {
            let mut ring = self.ring();
            for record in records {
                ring.push(Arc::clone(record));
            }
        }

        self.notify(records);
    }

    /// Returns all retained records in insertion order (oldest to newest).
    pub fn get_all(&self) -> Vec<SharedRecord> {
        self.ring().ordered()
    }

    /// Keeps only the newest `max` records.
    ///
    /// The all-time total is reset to the retained count; this bounds memory
    /// and does not preserve history.
    pub fn shrink_to(&self, max: usize) {
        let mut ring = self.ring();
        if ring.count() <= max {
            return;
        }

        let ordered = ring.ordered();
        let newest = &ordered[ordered.len() - max..];

        ring.reset();
        for (slot, record) in ring.slots.iter_mut().zip(newest) {
            *slot = Some(Arc::clone(record));
        }
        ring.total_count = max as u64;
        ring.head = max % self.capacity;

        trace!(retained = max, "ring buffer shrunk");
    }

    /// Drops every record and resets the counters.
    pub fn clear(&self) {
        self.ring().reset();
    }

    /// Registers a callback receiving each newly inserted batch.
    ///
    /// Listeners run on the inserting thread after the store lock is released.
    pub fn on_batch<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[SharedRecord]) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Returns a queue that receives a copy of every inserted batch.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<SharedRecord>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_batch(move |batch| {
            // A dropped receiver just stops observing
            let _ = tx.send(batch.to_vec());
        });
        rx
    }

    fn notify(&self, batch: &[SharedRecord]) {
        let listeners: Vec<BatchListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(batch);
        }
    }
}
