//! In-process named objects with the same create-or-open semantics as the
//! system debug objects, plus the producer half of the handshake.
//!
//! A [`LoopbackNamespace`] stands in for the OS object namespace: every
//! channel and producer opened from the same namespace and scope shares one
//! section and one READY/DATA pair. Namespaces are independent of each other,
//! so concurrent tests never see each other's traffic.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::layout::{encode_buffer, BUFFER_SIZE};
use super::transport::{DebugTransport, TransportFactory};
use super::CaptureScope;
use crate::error::CaptureError;

/// Auto-reset binary signal: a successful wait consumes the signal.
#[derive(Default)]
struct AutoResetEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl AutoResetEvent {
    fn set(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        *signaled = true;
        self.cond.notify_one();
    }

    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut signaled, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |signaled| !*signaled)
            .unwrap_or_else(PoisonError::into_inner);
        if *signaled {
            *signaled = false;
            true
        } else {
            false
        }
    }
}

struct Section {
    bytes: Mutex<Vec<u8>>,
    /// Serializes producers for a whole READY/write/DATA exchange.
    writer: Mutex<()>,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            bytes: Mutex::new(vec![0u8; BUFFER_SIZE]),
            writer: Mutex::new(()),
        }
    }
}

#[derive(Default)]
struct NamespaceInner {
    events: DashMap<String, Arc<AutoResetEvent>>,
    sections: DashMap<String, Arc<Section>>,
    denied: DashMap<String, ()>,
    open_handles: AtomicUsize,
}

/// An isolated namespace of named sections and events.
#[derive(Clone, Default)]
pub struct LoopbackNamespace {
    inner: Arc<NamespaceInner>,
}

/// The three objects for one scope, each counted as an open handle.
struct Handles {
    ns: LoopbackNamespace,
    section: Arc<Section>,
    buffer_ready: Arc<AutoResetEvent>,
    data_ready: Arc<AutoResetEvent>,
}

impl Drop for Handles {
    fn drop(&mut self) {
        self.ns.inner.open_handles.fetch_sub(3, Ordering::SeqCst);
    }
}

impl LoopbackNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later attempt to create or open `name` fail.
    pub fn deny(&self, name: impl Into<String>) {
        self.inner.denied.insert(name.into(), ());
    }

    /// Number of handles currently held by channels and producers.
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    fn check(&self, scope: CaptureScope, name: &str) -> Result<(), CaptureError> {
        if self.inner.denied.contains_key(name) {
            return Err(CaptureError::ResourceAcquisition {
                scope,
                resource: name.to_string(),
                reason: "access denied".to_string(),
            });
        }
        Ok(())
    }

    fn open_handles_for(&self, scope: CaptureScope) -> Result<Handles, CaptureError> {
        let names = scope.object_names();
        self.check(scope, &names.buffer)?;
        self.check(scope, &names.buffer_ready)?;
        self.check(scope, &names.data_ready)?;

        let section = Arc::clone(self.inner.sections.entry(names.buffer).or_default().value());
        let buffer_ready = Arc::clone(self.inner.events.entry(names.buffer_ready).or_default().value());
        let data_ready = Arc::clone(self.inner.events.entry(names.data_ready).or_default().value());

        self.inner.open_handles.fetch_add(3, Ordering::SeqCst);
        Ok(Handles {
            ns: self.clone(),
            section,
            buffer_ready,
            data_ready,
        })
    }
}

impl TransportFactory for LoopbackNamespace {
    fn open(&self, scope: CaptureScope) -> Result<Box<dyn DebugTransport>, CaptureError> {
        Ok(Box::new(LoopbackTransport {
            handles: self.open_handles_for(scope)?,
        }))
    }
}

/// Reader side of a loopback scope.
struct LoopbackTransport {
    handles: Handles,
}

impl DebugTransport for LoopbackTransport {
    fn signal_ready(&mut self) -> Result<(), CaptureError> {
        self.handles.buffer_ready.set();
        Ok(())
    }

    fn wait_data(&mut self, timeout: Duration) -> Result<bool, CaptureError> {
        Ok(self.handles.data_ready.wait(timeout))
    }

    fn read_buffer(&mut self, buf: &mut [u8]) {
        let bytes = self.handles.section.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        let len = buf.len().min(bytes.len());
        buf[..len].copy_from_slice(&bytes[..len]);
    }
}

/// Producer side of the handshake, the loopback counterpart of a process
/// calling the debug-output API.
pub struct LoopbackProducer {
    handles: Handles,
    pid: i32,
}

impl LoopbackProducer {
    pub fn open(ns: &LoopbackNamespace, scope: CaptureScope, pid: i32) -> Result<Self, CaptureError> {
        Ok(Self {
            handles: ns.open_handles_for(scope)?,
            pid,
        })
    }

    /// Sends one message. Returns false if no reader signalled READY within `timeout`.
    pub fn send(&self, message: &str, timeout: Duration) -> bool {
        self.send_raw(&encode_buffer(self.pid, message), timeout)
    }

    /// Writes raw section bytes (truncated to the section size) and signals DATA.
    pub fn send_raw(&self, raw: &[u8], timeout: Duration) -> bool {
        let _writer = self.handles.section.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.handles.buffer_ready.wait(timeout) {
            return false;
        }

        {
            let mut bytes = self.handles.section.bytes.lock().unwrap_or_else(PoisonError::into_inner);
            bytes.iter_mut().for_each(|b| *b = 0);
            let len = raw.len().min(bytes.len());
            bytes[..len].copy_from_slice(&raw[..len]);
        }

        self.handles.data_ready.set();
        true
    }
}
