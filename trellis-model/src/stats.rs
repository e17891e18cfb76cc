//! Aggregate task counts for one user.

use serde::{Deserialize, Serialize};

/// Per-priority task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

/// Aggregate counts over one user's task set: total, per-status, and
/// per-priority. A pure read; computed in a single query by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub by_priority: PriorityCounts,
}
