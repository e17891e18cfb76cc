use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::debug;
use trellis_model::{
    NewTask, PriorityCounts, Task, TaskFilter, TaskPatch, TaskStatistics,
    TaskStatus,
};
use uuid::Uuid;

use super::LOCK_TIMEOUT;
use crate::database::ports::TaskStore;
use crate::error::{Result, TaskError};

const TASK_COLUMNS: &str = "id, owner_id, title, description, status, \
                            priority, sort_order, completed_at, created_at, \
                            updated_at";

/// PostgreSQL-backed ordering store.
///
/// Appends and reorders for one owner are serialized with row locks inside
/// a single transaction, which is what keeps the per-owner order sequence
/// dense under concurrency. Operations for different owners never contend.
#[derive(Clone, Debug)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn append(&self, owner_id: Uuid, new_task: &NewTask) -> Result<Task> {
        let mut tx = self.pool().begin().await.map_err(TaskError::from_sqlx)?;
        sqlx::query(LOCK_TIMEOUT)
            .execute(&mut *tx)
            .await
            .map_err(TaskError::from_sqlx)?;

        // Locking the owner row serializes concurrent appends for this
        // owner and doubles as the existence check.
        let owner = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(TaskError::from_sqlx)?;
        if owner.is_none() {
            return Err(TaskError::NotFound("user"));
        }

        let next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks \
             WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(TaskError::from_sqlx)?;

        let now = Utc::now();
        let completed_at =
            (new_task.status == TaskStatus::Completed).then_some(now);

        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks \
             (owner_id, title, description, status, priority, sort_order, \
              completed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.status)
        .bind(new_task.priority)
        .bind(next_order)
        .bind(completed_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(TaskError::from_sqlx)?;

        tx.commit().await.map_err(TaskError::from_sqlx)?;
        debug!(task_id = %task.id, owner_id = %owner_id, order = next_order, "appended task");
        Ok(task)
    }

    async fn find(&self, task_id: Uuid) -> Result<Option<Task>> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(self.pool())
        .await
        .map_err(TaskError::from_sqlx)
    }

    async fn update(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task> {
        let mut tx = self.pool().begin().await.map_err(TaskError::from_sqlx)?;
        sqlx::query(LOCK_TIMEOUT)
            .execute(&mut *tx)
            .await
            .map_err(TaskError::from_sqlx)?;

        let mut task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(TaskError::from_sqlx)?
        .ok_or(TaskError::NotFound("task"))?;

        task.apply(patch, Utc::now());

        sqlx::query(
            "UPDATE tasks SET title = $2, description = $3, status = $4, \
             priority = $5, completed_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(TaskError::from_sqlx)?;

        tx.commit().await.map_err(TaskError::from_sqlx)?;
        Ok(task)
    }

    async fn delete(&self, task_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(self.pool())
            .await
            .map_err(TaskError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound("task"));
        }
        // Remaining sort_order values are left exactly as they were; gaps
        // stay until the client issues a reorder.
        Ok(())
    }

    async fn reorder(
        &self,
        owner_id: Uuid,
        mapping: &HashMap<Uuid, i32>,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(TaskError::from_sqlx)?;
        sqlx::query(LOCK_TIMEOUT)
            .execute(&mut *tx)
            .await
            .map_err(TaskError::from_sqlx)?;

        // Lock the owner's rows for the duration so readers never observe
        // a partially-applied permutation and concurrent appends wait.
        let owned: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM tasks WHERE owner_id = $1 FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(TaskError::from_sqlx)?
        .into_iter()
        .collect();

        if mapping.keys().any(|id| !owned.contains(id)) {
            // Reject the whole mapping; dropping the transaction applies
            // nothing.
            return Err(TaskError::validation(
                "tasks",
                "you can only reorder your own tasks",
            ));
        }

        let now = Utc::now();
        for (task_id, sort_order) in mapping {
            sqlx::query(
                "UPDATE tasks SET sort_order = $2, updated_at = $3 \
                 WHERE id = $1",
            )
            .bind(task_id)
            .bind(sort_order)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(TaskError::from_sqlx)?;
        }

        tx.commit().await.map_err(TaskError::from_sqlx)?;
        debug!(owner_id = %owner_id, moved = mapping.len(), "reordered tasks");
        Ok(())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = "
        ));
        builder.push_bind(owner_id);

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ");
            builder.push_bind(priority);
        }
        if let Some(term) = filter.search_term() {
            let pattern = format!("%{}%", escape_like(term));
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY sort_order ASC");

        builder
            .build_query_as::<Task>()
            .fetch_all(self.pool())
            .await
            .map_err(TaskError::from_sqlx)
    }

    async fn statistics(&self, owner_id: Uuid) -> Result<TaskStatistics> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
             COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress, \
             COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
             COUNT(*) FILTER (WHERE priority = 'low') AS low, \
             COUNT(*) FILTER (WHERE priority = 'medium') AS medium, \
             COUNT(*) FILTER (WHERE priority = 'high') AS high \
             FROM tasks WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(self.pool())
        .await
        .map_err(TaskError::from_sqlx)?;

        Ok(TaskStatistics {
            total: row.try_get("total").map_err(TaskError::from_sqlx)?,
            pending: row.try_get("pending").map_err(TaskError::from_sqlx)?,
            in_progress: row
                .try_get("in_progress")
                .map_err(TaskError::from_sqlx)?,
            completed: row
                .try_get("completed")
                .map_err(TaskError::from_sqlx)?,
            by_priority: PriorityCounts {
                low: row.try_get("low").map_err(TaskError::from_sqlx)?,
                medium: row.try_get("medium").map_err(TaskError::from_sqlx)?,
                high: row.try_get("high").map_err(TaskError::from_sqlx)?,
            },
        })
    }

    async fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE created_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await
            .map_err(TaskError::from_sqlx)?;
        Ok(result.rows_affected())
    }
}

// ILIKE treats %, _ and \ specially; a search term is literal text.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
