//! # Trellis Server
//!
//! Task tracker server.
//!
//! ## Overview
//!
//! Trellis Server exposes an authenticated task API over axum:
//!
//! - **Ordered task lists**: every user's tasks carry a dense order key,
//!   kept consistent under concurrent appends and reorders
//! - **Ownership and admin override**: tasks are visible and mutable only
//!   to their owner or an admin
//! - **Real-time fan-out**: committed mutations are pushed to the owner's
//!   other connected sessions over WebSocket, excluding the originator
//! - **Retention sweep**: tasks past the retention window are removed by a
//!   periodic background job
//!
//! ## Architecture
//!
//! The server is built on axum and uses:
//! - PostgreSQL for persistent storage
//! - opaque bearer sessions resolved by middleware
//! - per-user WebSocket channels for event delivery

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
