//! Repository port traits.
//!
//! The service depends on these traits, not on PostgreSQL; the adapters in
//! [`super::postgres`] are the production implementations and the doubles
//! in [`crate::testing`] back the fast suites.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trellis_model::{
    NewTask, Task, TaskFilter, TaskPatch, TaskStatistics, User,
};
use uuid::Uuid;

use crate::error::Result;

/// The ordering store: task persistence plus the per-owner dense order
/// sequence.
///
/// Implementations must serialize `append` and `reorder` per owner (two
/// concurrent appends for one owner never receive the same order value)
/// while leaving different owners fully independent. `delete` leaves the
/// remaining order values untouched; renumbering only ever arrives as a
/// caller-supplied `reorder` mapping.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task at the end of the owner's list
    /// (`max(sort_order) + 1`, or 0 for an empty list).
    async fn append(&self, owner_id: Uuid, new_task: &NewTask) -> Result<Task>;

    /// Fetch a single task by id.
    async fn find(&self, task_id: Uuid) -> Result<Option<Task>>;

    /// Apply a field patch. Entering `completed` stamps `completed_at`,
    /// leaving it clears the stamp; the order key is never mutated here.
    async fn update(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task>;

    /// Remove the row unconditionally. The caller has already authorized.
    async fn delete(&self, task_id: Uuid) -> Result<()>;

    /// Apply a full or partial order mapping atomically. Every id must
    /// belong to `owner_id`; otherwise the whole mapping is rejected and
    /// nothing is applied. The store does not verify the result is
    /// contiguous; that is the caller's contract.
    async fn reorder(
        &self,
        owner_id: Uuid,
        mapping: &HashMap<Uuid, i32>,
    ) -> Result<()>;

    /// The owner's tasks matching `filter`, ordered by `sort_order`
    /// ascending.
    async fn list(&self, owner_id: Uuid, filter: &TaskFilter)
    -> Result<Vec<Task>>;

    /// Aggregate counts for one owner. Pure read.
    async fn statistics(&self, owner_id: Uuid) -> Result<TaskStatistics>;

    /// Retention sweep support: delete every task created strictly before
    /// `cutoff`, returning the count removed.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>)
    -> Result<u64>;
}

/// Read-side access to users and their sessions. Token issuance is the
/// external credential service's business; this port only resolves what it
/// produced.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Resolve a session by token fingerprint, returning the user when the
    /// session exists, is unrevoked, and has not expired at `now`.
    async fn resolve_session(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;
}
