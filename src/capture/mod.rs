//! Debug-output capture.
//!
//! This module provides:
//! - `layout`: Byte layout of the shared debug buffer and its decoder
//! - `transport`: The named section + READY/DATA event pair a channel reads through
//! - `channel`: The handshake loop turning signalled buffers into records
//! - `loopback`: In-process named objects and a producer for tests and demos
//! - `win32`: The system `DBWIN_*` objects (Windows only)

pub mod channel;
pub mod layout;
pub mod loopback;
pub mod transport;
#[cfg(windows)]
pub mod win32;

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::error::CaptureError;
use crate::record::LogRecord;

pub use channel::{CaptureChannel, DEFAULT_WAIT_TIMEOUT};
pub use layout::{decode_buffer, encode_buffer, DecodedMessage, BUFFER_SIZE, MESSAGE_SIZE};
pub use loopback::{LoopbackNamespace, LoopbackProducer};
pub use transport::{system_backend, DebugTransport, TransportFactory};

/// Well-known base name of the debug buffer objects.
pub const DBWIN_BUFFER: &str = "DBWIN_BUFFER";
pub const DBWIN_BUFFER_READY: &str = "DBWIN_BUFFER_READY";
pub const DBWIN_DATA_READY: &str = "DBWIN_DATA_READY";

/// Visibility of a capture channel's named objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureScope {
    /// Objects in the current session namespace.
    Local,
    /// Objects in the system-wide namespace (`Global\` prefix).
    Global,
}

impl CaptureScope {
    pub fn prefix(&self) -> &'static str {
        match self {
            CaptureScope::Local => "",
            CaptureScope::Global => "Global\\",
        }
    }

    /// Names of the section, buffer-ready event and data-ready event.
    pub fn object_names(&self) -> ObjectNames {
        let prefix = self.prefix();
        ObjectNames {
            buffer: format!("{prefix}{DBWIN_BUFFER}"),
            buffer_ready: format!("{prefix}{DBWIN_BUFFER_READY}"),
            data_ready: format!("{prefix}{DBWIN_DATA_READY}"),
        }
    }
}

impl fmt::Display for CaptureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureScope::Local => write!(f, "local"),
            CaptureScope::Global => write!(f, "global"),
        }
    }
}

/// Deterministic object names derived from a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNames {
    pub buffer: String,
    pub buffer_ready: String,
    pub data_ready: String,
}

/// A blocking producer of records, run on its own thread by the multiplexer.
pub trait LogSource: Send + Sync {
    /// Human-readable source name used in logs.
    fn name(&self) -> String;

    /// Runs until `cancel` fires or an unrecoverable error occurs, handing
    /// every record to `sink`. A `false` return from `sink` means nobody is
    /// listening any more and the source should stop.
    ///
    /// The sink assigns record ids; whatever id a source sets is replaced.
    fn run(
        &self,
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<(), CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_names() {
        let local = CaptureScope::Local.object_names();
        assert_eq!(local.buffer, "DBWIN_BUFFER");
        assert_eq!(local.buffer_ready, "DBWIN_BUFFER_READY");
        assert_eq!(local.data_ready, "DBWIN_DATA_READY");

        let global = CaptureScope::Global.object_names();
        assert_eq!(global.buffer, "Global\\DBWIN_BUFFER");
        assert_eq!(global.data_ready, "Global\\DBWIN_DATA_READY");
    }
}
