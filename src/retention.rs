//! Retention policies applied to a [`LogStore`] after each delivered batch.

use crate::ringbuffer::LogStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the store is kept below a working-set limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionMode {
    /// Rely on the ring capacity alone.
    None,
    /// Drop everything once `limit` records are retained.
    AutoClear(usize),
    /// Trim to the newest `limit` records whenever the count exceeds it.
    KeepMax(usize),
}

/// What [`RetentionMode::apply`] did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionOutcome {
    Unchanged,
    Cleared,
    /// Records with ids below `oldest_id` are gone. `None` when nothing is left.
    Shrunk { oldest_id: Option<u64> },
}

impl RetentionMode {
    pub fn limit(&self) -> Option<usize> {
        match self {
            RetentionMode::None => None,
            RetentionMode::AutoClear(limit) | RetentionMode::KeepMax(limit) => Some(*limit),
        }
    }

    pub fn apply(&self, store: &LogStore) -> RetentionOutcome {
        match *self {
            RetentionMode::None => RetentionOutcome::Unchanged,
            RetentionMode::AutoClear(limit) => {
                if store.count() >= limit {
                    debug!(limit, "retention limit reached, clearing store");
                    store.clear();
                    RetentionOutcome::Cleared
                } else {
                    RetentionOutcome::Unchanged
                }
            }
            RetentionMode::KeepMax(limit) => {
                if store.count() > limit {
                    store.shrink_to(limit);
                    let oldest_id = store.get_all().first().map(|r| r.id);
                    RetentionOutcome::Shrunk { oldest_id }
                } else {
                    RetentionOutcome::Unchanged
                }
            }
        }
    }
}
