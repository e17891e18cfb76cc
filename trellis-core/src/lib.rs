//! # Trellis Core
//!
//! Core library for the Trellis task tracker: the ownership policy, the
//! per-owner ordering store, the task service that composes them, and the
//! post-commit event notifier port.
//!
//! ## Overview
//!
//! - **Authorization Policy**: pure owner-or-admin capability checks over a
//!   closed role set, resolved once per call ([`policy`])
//! - **Ordering Store**: PostgreSQL-backed task persistence keeping each
//!   owner's order keys dense under concurrent appends and reorders
//!   ([`database`])
//! - **Task Service**: the single authority every other layer calls into;
//!   policy first, store second, notification strictly after commit
//!   ([`service`])
//! - **Event Notifier**: fire-and-forget port carrying committed mutations
//!   to the owner's private channel ([`notify`])
//!
//! ## Feature Flags
//!
//! - `test-utils`: in-memory store doubles and session-token helpers for
//!   downstream test suites
//! - `db-tests`: enables the PostgreSQL integration suites (they need a
//!   database reachable via `DATABASE_URL`)

pub mod api_types;
pub mod auth;
pub mod database;
pub mod error;
pub mod notify;
pub mod policy;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{Result, TaskError};
pub use service::TaskService;

/// Embedded schema migrations, applied at startup and by `#[sqlx::test]`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
