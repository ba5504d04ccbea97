//! The named objects a capture channel reads through.

use std::sync::Arc;
use std::time::Duration;

use super::CaptureScope;
use crate::error::CaptureError;

/// An opened section plus READY/DATA event pair for one scope.
///
/// Dropping the transport releases the mapping and both events.
pub trait DebugTransport: Send {
    /// Signals READY: the reader can accept one message.
    fn signal_ready(&mut self) -> Result<(), CaptureError>;

    /// Waits for DATA. Returns `Ok(false)` when `timeout` elapses first.
    fn wait_data(&mut self, timeout: Duration) -> Result<bool, CaptureError>;

    /// Copies the section into `buf`, up to `buf.len()` bytes.
    fn read_buffer(&mut self, buf: &mut [u8]);
}

/// Creates or opens the named objects for a scope.
pub trait TransportFactory: Send + Sync {
    fn open(&self, scope: CaptureScope) -> Result<Box<dyn DebugTransport>, CaptureError>;
}

/// Backend reading the operating system's `DBWIN_*` objects.
pub fn system_backend() -> Arc<dyn TransportFactory> {
    #[cfg(windows)]
    {
        Arc::new(super::win32::Win32Backend)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedBackend)
    }
}

/// Stand-in on platforms without a debug-output facility.
#[cfg(not(windows))]
struct UnsupportedBackend;

#[cfg(not(windows))]
impl TransportFactory for UnsupportedBackend {
    fn open(&self, scope: CaptureScope) -> Result<Box<dyn DebugTransport>, CaptureError> {
        Err(CaptureError::Unsupported(scope))
    }
}
