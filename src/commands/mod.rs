//! CLI command implementations for dbwin-monitor.
//!
//! This module provides implementations for all CLI modes:
//! - `run`: Live capture session (default mode)
//! - `config`: Configuration file generation
//! - `filters`: Filter settings inspection and editing
//! - `demo`: Pipeline exercise over the loopback backend

pub mod config;
pub mod demo;
pub mod filters;
pub mod run;

// Re-export command functions
pub use config::command_config;
pub use demo::command_demo;
pub use filters::command_filters;
pub use run::command_run;
