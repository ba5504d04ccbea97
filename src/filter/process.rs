//! Process-name include/exclude filtering.

use serde::{Deserialize, Serialize};

use super::rules::contains_ignore_case;
use crate::record::LogRecord;

/// Whether configured names select or reject records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessFilterMode {
    #[default]
    Include,
    Exclude,
}

/// Read-only process filter input, derived from the persisted settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilterConfig {
    pub enabled: bool,
    pub mode: ProcessFilterMode,
    pub names: Vec<String>,
}

/// Reduces a process token to a bare, comparable name.
///
/// Trims whitespace and quotes, keeps only the last path component and drops
/// a trailing `.exe` in any case.
pub fn normalize_process_name(token: &str) -> String {
    let mut name = token.trim().trim_matches('"');

    if name.contains(['\\', '/']) {
        name = name.rsplit(['\\', '/']).next().unwrap_or(name);
    }

    if name.len() >= 4 && name.is_char_boundary(name.len() - 4) {
        let (stem, ext) = name.split_at(name.len() - 4);
        if ext.eq_ignore_ascii_case(".exe") {
            name = stem;
        }
    }

    name.trim().to_string()
}

/// Exact (case-insensitive) match on normalized names, falling back to
/// substring containment for filters written against older name formats.
pub fn is_process_match(process_name: &str, filter: &str) -> bool {
    let process = normalize_process_name(process_name);
    let filter = normalize_process_name(filter);

    if process.is_empty() || filter.is_empty() {
        return false;
    }

    process.to_lowercase() == filter.to_lowercase() || contains_ignore_case(&process, &filter)
}

/// Applies the process filter to a record.
pub fn matches_process_filter(record: &LogRecord, config: &ProcessFilterConfig) -> bool {
    if !config.enabled || config.names.is_empty() {
        return true;
    }

    let matched = config
        .names
        .iter()
        .any(|name| is_process_match(&record.process_name, name));

    match config.mode {
        ProcessFilterMode::Include => matched,
        ProcessFilterMode::Exclude => !matched,
    }
}
