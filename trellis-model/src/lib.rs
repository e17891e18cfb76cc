//! Core data model definitions shared across Trellis crates.
//!
//! Everything here is plain data: tasks and their status/priority enums,
//! the authenticated user shape, broadcast events, and the request payloads
//! the API accepts. The only behaviour that lives in this crate is behaviour
//! that must stay identical everywhere it runs (field validation and the
//! `completed_at` transition rule), so the PostgreSQL store, the in-memory
//! test store, and the HTTP layer can never drift apart.
//!
//! ## Feature Flags
//!
//! - `sqlx`: derives [`sqlx::FromRow`]/[`sqlx::Type`] on the row-shaped types
#![allow(missing_docs)]

pub mod event;
pub mod stats;
pub mod task;
pub mod user;

pub use event::TaskEvent;
pub use stats::{PriorityCounts, TaskStatistics};
pub use task::{
    DESCRIPTION_MAX_CHARS, FieldViolation, NewTask, TITLE_MAX_CHARS, Task,
    TaskFilter, TaskPatch, TaskPriority, TaskStatus,
};
pub use user::User;
