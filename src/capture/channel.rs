//! The READY/DATA handshake loop for one capture scope.
//!
//! Each iteration signals READY, then waits on DATA for at most the wait
//! timeout. The wait primitive cannot be interrupted, so cancellation is
//! observed between waits: a stop request takes effect within one timeout.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::layout::{decode_buffer, BUFFER_SIZE};
use super::transport::{DebugTransport, TransportFactory};
use super::{CaptureScope, LogSource};
use crate::error::CaptureError;
use crate::record::LogRecord;
use crate::resolver::ProcessNameResolver;
use crate::stats::PipelineStats;

/// Upper bound on how long a stop request waits for a channel.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Reads debug output for one scope.
pub struct CaptureChannel {
    scope: CaptureScope,
    backend: Arc<dyn TransportFactory>,
    resolver: Arc<ProcessNameResolver>,
    wait_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl CaptureChannel {
    pub fn new(
        scope: CaptureScope,
        backend: Arc<dyn TransportFactory>,
        resolver: Arc<ProcessNameResolver>,
    ) -> Self {
        Self {
            scope,
            backend,
            resolver,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn scope(&self) -> CaptureScope {
        self.scope
    }
}

impl CaptureChannel {
    /// Reads the signalled buffer and hands the decoded record to `sink`.
    fn deliver(
        &self,
        transport: &mut dyn DebugTransport,
        buf: &mut [u8],
        sink: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<(), CaptureError> {
        transport.read_buffer(buf);

        let Some(decoded) = decode_buffer(buf) else {
            self.stats.empty_discarded.fetch_add(1, Ordering::Relaxed);
            trace!(scope = %self.scope, "discarded empty message");
            return Ok(());
        };

        let process_name = self.resolver.resolve(decoded.pid);
        let record = LogRecord::unsequenced(decoded.pid, process_name, decoded.text);
        self.stats.records_captured.fetch_add(1, Ordering::Relaxed);

        if !sink(record) {
            debug!(scope = %self.scope, "record receiver gone, stopping channel");
            return Err(CaptureError::ReceiverClosed);
        }
        Ok(())
    }
}

impl LogSource for CaptureChannel {
    fn name(&self) -> String {
        match self.scope {
            CaptureScope::Local => "Local OutputDebugString".to_string(),
            CaptureScope::Global => "Global OutputDebugString".to_string(),
        }
    }

    fn run(
        &self,
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<(), CaptureError> {
        // Dropped on every return path, releasing section and events
        let mut transport = self.backend.open(self.scope)?;
        info!(scope = %self.scope, "capture channel opened");

        let mut buf = vec![0u8; BUFFER_SIZE];

        while !cancel.is_cancelled() {
            transport.signal_ready()?;

            if !transport.wait_data(self.wait_timeout)? {
                std::thread::yield_now();
                continue;
            }

            self.deliver(transport.as_mut(), &mut buf, sink)?;
        }

        // A producer may have signalled DATA after the last wait timed out
        if transport.wait_data(Duration::ZERO)? {
            self.deliver(transport.as_mut(), &mut buf, sink)?;
        }

        info!(scope = %self.scope, "capture channel closed");
        Ok(())
    }
}
