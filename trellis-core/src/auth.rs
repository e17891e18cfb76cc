//! Opaque bearer-token validation.
//!
//! Token issuance lives in an external credential service; Trellis only
//! consumes the result. Presented tokens are high-entropy secrets, so the
//! sessions table stores a SHA-256 fingerprint rather than the token
//! itself, and lookup hashes the presented value before comparing.

use chrono::Utc;
use sha2::{Digest, Sha256};
use trellis_model::User;

use crate::database::ports::UserStore;
use crate::error::Result;

/// Hex SHA-256 fingerprint of a bearer token, as persisted in the
/// sessions table.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve a presented bearer token to its user, if the backing session
/// exists, is unrevoked, and has not expired.
pub async fn authenticate(
    users: &dyn UserStore,
    token: &str,
) -> Result<Option<User>> {
    users
        .resolve_session(&token_fingerprint(token), Utc::now())
        .await
}
