use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use trellis_model::User;
use uuid::Uuid;

use crate::database::ports::UserStore;
use crate::error::{Result, TaskError};

const USER_COLUMNS: &str =
    "id, username, display_name, is_admin, created_at, updated_at";

/// PostgreSQL-backed user and session reads.
#[derive(Clone, Debug)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskError::from_sqlx)
    }

    async fn resolve_session(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.display_name, u.is_admin, \
             u.created_at, u.updated_at \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token_hash = $1 AND NOT s.revoked AND s.expires_at > $2",
        )
        .bind(token_fingerprint)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskError::from_sqlx)
    }
}
