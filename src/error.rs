//! Error types for the capture pipeline, store, filters and settings.
//!
//! Only conditions that a caller can act on are represented here. Decode
//! anomalies and failed PID lookups are absorbed where they happen and never
//! reach these types.

use crate::capture::CaptureScope;

/// Failure of a single capture channel.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A shared-memory section or named event could not be created or opened.
    /// Fatal to the owning channel only.
    #[error("{scope} capture: failed to acquire {resource}: {reason}")]
    ResourceAcquisition {
        scope: CaptureScope,
        resource: String,
        reason: String,
    },

    /// A handshake primitive failed after the channel was opened.
    #[error("{scope} capture: handshake failed: {reason}")]
    Handshake { scope: CaptureScope, reason: String },

    /// No system debug-output backend exists on this platform.
    #[error("{0} capture is not supported on this platform")]
    Unsupported(CaptureScope),

    /// The downstream queue was closed while the channel was still running.
    #[error("record receiver closed")]
    ReceiverClosed,
}

/// Errors raised when constructing a store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("ring buffer capacity must be greater than zero")]
    ZeroCapacity,
}

/// Errors reported by edit-time rule validation.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while loading or saving filter settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(String),

    #[error("failed to serialize settings: {0}")]
    Serialize(String),
}
