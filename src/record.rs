//! Captured debug-output records and their text renderings.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide sequence, drawn by the multiplexer as records are queued.
static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Leading `[tag]`, `-` and whitespace runs stripped by [`clean_message_text`].
static MESSAGE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[[^\]]*\]|-|\s)+").expect("message prefix pattern is valid")
});

/// Records are shared between the queue, the store and listeners without copying.
pub type SharedRecord = Arc<LogRecord>;

/// A single decoded debug-output message.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogRecord {
    /// Globally unique sequence id, increasing in queue order. Zero until queued.
    pub id: u64,
    pub timestamp: DateTime<Local>,
    pub process_id: i32,
    pub process_name: String,
    pub message: String,
}

/// Id of a record that has not been queued yet.
pub const UNSEQUENCED_ID: u64 = 0;

impl LogRecord {
    /// Builds a record stamped with the next global id and the current time.
    pub fn new(process_id: i32, process_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: next_record_id(),
            ..Self::unsequenced(process_id, process_name, message)
        }
    }

    /// Builds a record without an id. The multiplexer assigns one when the
    /// record enters the fan-in queue.
    pub fn unsequenced(
        process_id: i32,
        process_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: UNSEQUENCED_ID,
            timestamp: Local::now(),
            process_id,
            process_name: process_name.into(),
            message: message.into(),
        }
    }
}

/// Allocates the next id from the shared sequence.
pub fn next_record_id() -> u64 {
    NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Renders a record as `2024-05-01 12:00:00,123 [proc] message`.
///
/// The separating space is omitted when the message already opens with a
/// bracketed tag so that `[proc][tag]` reads as one prefix.
pub fn format_full(record: &LogRecord) -> String {
    let sep = if record.message.starts_with('[') { "" } else { " " };
    format!(
        "{} [{}]{}{}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
        record.process_name,
        sep,
        record.message
    )
}

/// Strips leading `[...]` tags, dashes and whitespace from a message and
/// flattens it onto one line.
pub fn clean_message_text(message: &str) -> String {
    let stripped = MESSAGE_PREFIX.replace(message, "");
    let text = if stripped.trim().is_empty() {
        message
    } else {
        stripped.as_ref()
    };
    text.replace('\r', "").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(message: &str) -> LogRecord {
        LogRecord {
            id: 7,
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap(),
            process_id: 42,
            process_name: "app".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let a = LogRecord::new(1, "a", "x");
        let b = LogRecord::new(1, "a", "y");
        assert!(b.id > a.id);
        assert_eq!(LogRecord::unsequenced(1, "a", "z").id, UNSEQUENCED_ID);
    }

    #[test]
    fn test_format_full_spacing() {
        assert_eq!(
            format_full(&record_at("hello")),
            "2024-05-01 12:30:45,000 [app] hello"
        );
        assert_eq!(
            format_full(&record_at("[net] up")),
            "2024-05-01 12:30:45,000 [app][net] up"
        );
    }

    #[test]
    fn test_clean_message_text() {
        assert_eq!(clean_message_text("[INFO][net] - connected"), "connected");
        assert_eq!(clean_message_text("line1\r\nline2"), "line1 line2");
        // Nothing left after stripping falls back to the original
        assert_eq!(clean_message_text("[only-tag]"), "[only-tag]");
    }
}
