//! Fan-in of any number of capture sources into one batched stream.
//!
//! Each source runs its blocking loop on the blocking thread pool and
//! forwards records into a shared unbounded queue. A single consumer task
//! drains the queue and hands records to the [`LogStore`] in batches: it
//! blocks for the first record, then takes whatever else is already queued
//! up to the batch ceiling.
//!
//! Record ids are assigned under one lock shared by all producers, together
//! with the enqueue, so ids increase in queue order and therefore in store
//! order.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::LogSource;
use crate::error::CaptureError;
use crate::record::{next_record_id, LogRecord, SharedRecord};
use crate::ringbuffer::LogStore;
use crate::stats::PipelineStats;

/// Largest batch handed to the store in one call.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// A source that stopped because of an error rather than cancellation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

struct Running {
    cancel: CancellationToken,
    producers: Vec<JoinHandle<()>>,
    consumer: JoinHandle<()>,
}

/// Runs registered sources concurrently and feeds their records to a store.
pub struct SourceMultiplexer {
    store: Arc<LogStore>,
    sources: Vec<Arc<dyn LogSource>>,
    batch_size: usize,
    stats: Arc<PipelineStats>,
    failures: Arc<Mutex<Vec<SourceFailure>>>,
    running: Option<Running>,
}

impl SourceMultiplexer {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self {
            store,
            sources: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            stats: Arc::new(PipelineStats::new()),
            failures: Arc::new(Mutex::new(Vec::new())),
            running: None,
        }
    }

    /// Sets the batch ceiling. Values below 1 are treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Registers a source. Takes effect on the next `start`.
    pub fn add_source(&mut self, source: impl LogSource + 'static) {
        self.sources.push(Arc::new(source));
    }

    pub fn add_shared_source(&mut self, source: Arc<dyn LogSource>) {
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Sources that stopped with an error since construction.
    pub fn failures(&self) -> Vec<SourceFailure> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.cancel.is_cancelled())
    }

    /// Spawns one producer per source and the consumer. No-op while running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel::<SharedRecord>();
        let sequencer = Arc::new(Mutex::new(()));

        let producers = self
            .sources
            .iter()
            .map(|source| {
                self.spawn_producer(
                    Arc::clone(source),
                    tx.clone(),
                    Arc::clone(&sequencer),
                    cancel.clone(),
                )
            })
            .collect();

        // Producers hold the only senders; the queue closes when they finish
        drop(tx);

        let consumer = tokio::spawn(consume(
            rx,
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
            self.batch_size,
        ));

        info!(sources = self.sources.len(), "capture started");
        self.running = Some(Running {
            cancel,
            producers,
            consumer,
        });
    }

    fn spawn_producer(
        &self,
        source: Arc<dyn LogSource>,
        tx: mpsc::UnboundedSender<SharedRecord>,
        sequencer: Arc<Mutex<()>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let failures = Arc::clone(&self.failures);

        tokio::task::spawn_blocking(move || {
            let name = source.name();
            let mut sink = |mut record: LogRecord| {
                let _order = sequencer.lock().unwrap_or_else(PoisonError::into_inner);
                record.id = next_record_id();
                tx.send(Arc::new(record)).is_ok()
            };

            match source.run(&cancel, &mut sink) {
                Ok(()) => debug!(source = %name, "source stopped"),
                Err(CaptureError::ReceiverClosed) => {
                    debug!(source = %name, "source stopped, queue closed")
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "source failed, other sources keep running");
                    stats
                        .failed_sources
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    failures
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(SourceFailure {
                            source: name,
                            error: e.to_string(),
                        });
                }
            }
        })
    }

    /// Cancels all sources, waits for them, then waits for the consumer to
    /// deliver everything already queued. No-op when not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();

        for producer in running.producers {
            if let Err(e) = producer.await {
                warn!(error = %e, "capture producer panicked");
            }
        }

        if let Err(e) = running.consumer.await {
            warn!(error = %e, "capture consumer panicked");
        }

        info!(total = self.store.total_count(), "capture stopped");
    }
}

impl Drop for SourceMultiplexer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

/// Drains the queue in batches until every sender is gone.
async fn consume(
    mut rx: mpsc::UnboundedReceiver<SharedRecord>,
    store: Arc<LogStore>,
    stats: Arc<PipelineStats>,
    batch_size: usize,
) {
    let mut batch: Vec<SharedRecord> = Vec::with_capacity(64);

    while let Some(first) = rx.recv().await {
        batch.push(first);
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(record) => batch.push(record),
                Err(_) => break,
            }
        }

        store.add_range(&batch);
        stats.record_batch(batch.len());
        debug!(size = batch.len(), "batch delivered");
        batch.clear();
    }
}
