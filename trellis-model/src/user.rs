//! The authenticated actor shape.
//!
//! Credential material never appears here: Trellis consumes opaque bearer
//! tokens issued elsewhere, and the sessions table stores only a token
//! fingerprint. What the rest of the system needs from a user is its
//! identity and the admin flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user. `is_admin` grants view/update/delete over any task
/// plus read access to any user's private event channel and statistics;
/// reordering stays scoped to the admin's own list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
