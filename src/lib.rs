//! DBWIN Monitor Library
//!
//! This library captures debug-output messages published through the DBWIN
//! shared-memory protocol and keeps them in a bounded, ordered store.
//!
//! # Features
//!
//! - **Capture**: One channel per scope (local session, global), each speaking
//!   the DBWIN handshake against a pluggable transport
//! - **Fan-in**: A multiplexer funnels every channel into one batched consumer
//! - **Bounded Store**: A ring buffer with batch-add notifications
//! - **Filtering**: Include/Exclude/Highlight message rules, process filters
//!   and colour rules persisted in a settings file
//!
//! # Usage
//!
//! ```rust,no_run
//! use dbwin_monitor::{CaptureChannel, CaptureScope, LogStore, SourceMultiplexer};
//! use dbwin_monitor::capture::LoopbackNamespace;
//! use dbwin_monitor::record::format_full;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let namespace = LoopbackNamespace::new();
//! let store = Arc::new(LogStore::new(10_000)?);
//!
//! let mut mux = SourceMultiplexer::new(store.clone());
//! mux.add_source(CaptureChannel::new(
//!     CaptureScope::Local,
//!     Arc::new(namespace.clone()),
//!     Default::default(),
//! ));
//! mux.start();
//!
//! // ... producers write messages ...
//!
//! mux.stop().await;
//! for record in store.get_all() {
//!     println!("{}", format_full(&record));
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod error;
pub mod filter;
pub mod multiplexer;
pub mod record;
pub mod resolver;
pub mod retention;
pub mod ringbuffer;
pub mod settings;
pub mod stats;

// Re-export main types for convenience
pub use capture::{CaptureChannel, CaptureScope, LogSource};
pub use error::{CaptureError, FilterError, SettingsError, StoreError};
pub use filter::{FilterEngine, FilterKind, FilterRule, MatchMode};
pub use multiplexer::SourceMultiplexer;
pub use record::{LogRecord, SharedRecord};
pub use resolver::ProcessNameResolver;
pub use retention::RetentionMode;
pub use ringbuffer::LogStore;
pub use settings::{FilterSettings, SettingsStore};
pub use stats::PipelineStats;
