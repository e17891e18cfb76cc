//! In-memory doubles and fixtures for fast, database-free test suites.
//!
//! The stores here implement the same port contracts as the PostgreSQL
//! adapters: the same order-assignment rule, whole-mapping rejection,
//! and filter semantics, so service behaviour can be exercised without a
//! running database. The PostgreSQL-specific locking behaviour is covered
//! separately by the `db-tests` suites.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use trellis_model::{
    NewTask, Task, TaskEvent, TaskFilter, TaskPatch, TaskPriority,
    TaskStatistics, TaskStatus, User,
};
use uuid::Uuid;

use crate::auth::token_fingerprint;
use crate::database::ports::{TaskStore, UserStore};
use crate::error::{Result, TaskError};
use crate::notify::TaskNotifier;

/// A fresh user fixture.
pub fn test_user(username: &str, is_admin: bool) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        display_name: username.to_string(),
        is_admin,
        created_at: now,
        updated_at: now,
    }
}

/// A task fixture owned by `owner_id` at the given order position.
pub fn test_task(owner_id: Uuid, title: &str, sort_order: i32) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        owner_id,
        title: title.to_string(),
        description: None,
        status: TaskStatus::Pending,
        priority: TaskPriority::Medium,
        sort_order,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory [`TaskStore`]. Unlike the PostgreSQL adapter it does not know
/// about users, so `append` accepts any owner id.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<Uuid, Task>>,
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn append(&self, owner_id: Uuid, new_task: &NewTask) -> Result<Task> {
        let mut tasks = self.tasks.lock().expect("task store poisoned");
        let next_order = tasks
            .values()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| t.sort_order + 1)
            .max()
            .unwrap_or(0);

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            owner_id,
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            status: new_task.status,
            priority: new_task.priority,
            sort_order: next_order,
            completed_at: (new_task.status == TaskStatus::Completed)
                .then_some(now),
            created_at: now,
            updated_at: now,
        };
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find(&self, task_id: Uuid) -> Result<Option<Task>> {
        let tasks = self.tasks.lock().expect("task store poisoned");
        Ok(tasks.get(&task_id).cloned())
    }

    async fn update(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task> {
        let mut tasks = self.tasks.lock().expect("task store poisoned");
        let task =
            tasks.get_mut(&task_id).ok_or(TaskError::NotFound("task"))?;
        task.apply(patch, Utc::now());
        Ok(task.clone())
    }

    async fn delete(&self, task_id: Uuid) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("task store poisoned");
        tasks.remove(&task_id).ok_or(TaskError::NotFound("task"))?;
        Ok(())
    }

    async fn reorder(
        &self,
        owner_id: Uuid,
        mapping: &HashMap<Uuid, i32>,
    ) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("task store poisoned");

        let foreign = mapping.keys().any(|id| {
            tasks.get(id).is_none_or(|task| task.owner_id != owner_id)
        });
        if foreign {
            return Err(TaskError::validation(
                "tasks",
                "you can only reorder your own tasks",
            ));
        }

        let now = Utc::now();
        for (task_id, sort_order) in mapping {
            if let Some(task) = tasks.get_mut(task_id) {
                task.sort_order = *sort_order;
                task.updated_at = now;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().expect("task store poisoned");
        let term = filter.search_term().map(str::to_lowercase);

        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
            .filter(|t| {
                term.as_deref().is_none_or(|term| {
                    t.title.to_lowercase().contains(term)
                        || t.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(term))
                })
            })
            .cloned()
            .collect();
        matched.sort_by_key(|t| t.sort_order);
        Ok(matched)
    }

    async fn statistics(&self, owner_id: Uuid) -> Result<TaskStatistics> {
        let tasks = self.tasks.lock().expect("task store poisoned");
        let mut stats = TaskStatistics::default();
        for task in tasks.values().filter(|t| t.owner_id == owner_id) {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            match task.priority {
                TaskPriority::Low => stats.by_priority.low += 1,
                TaskPriority::Medium => stats.by_priority.medium += 1,
                TaskPriority::High => stats.by_priority.high += 1,
            }
        }
        Ok(stats)
    }

    async fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tasks = self.tasks.lock().expect("task store poisoned");
        let before = tasks.len();
        tasks.retain(|_, task| task.created_at >= cutoff);
        Ok((before - tasks.len()) as u64)
    }
}

struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

/// In-memory [`UserStore`] that can also mint sessions, standing in for
/// the external credential service.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl std::fmt::Debug for InMemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserStore").finish_non_exhaustive()
    }
}

impl InMemoryUserStore {
    pub fn add_user(&self, user: User) {
        self.users
            .lock()
            .expect("user store poisoned")
            .insert(user.id, user);
    }

    /// Mint a bearer token for `user_id`, valid for 30 days.
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = format!("tok_{}", Uuid::new_v4().simple());
        self.sessions.lock().expect("user store poisoned").insert(
            token_fingerprint(&token),
            SessionRecord {
                user_id,
                expires_at: Utc::now() + Duration::days(30),
                revoked: false,
            },
        );
        token
    }

    pub fn revoke_token(&self, token: &str) {
        if let Some(session) = self
            .sessions
            .lock()
            .expect("user store poisoned")
            .get_mut(&token_fingerprint(token))
        {
            session.revoked = true;
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().expect("user store poisoned");
        Ok(users.get(&user_id).cloned())
    }

    async fn resolve_session(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let sessions = self.sessions.lock().expect("user store poisoned");
        let Some(session) = sessions.get(token_fingerprint) else {
            return Ok(None);
        };
        if session.revoked || session.expires_at <= now {
            return Ok(None);
        }
        let users = self.users.lock().expect("user store poisoned");
        Ok(users.get(&session.user_id).cloned())
    }
}

/// Captures every published event together with its origin.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<(TaskEvent, Option<Uuid>)>>,
}

impl RecordingNotifier {
    /// Drain and return everything published so far.
    pub fn take(&self) -> Vec<(TaskEvent, Option<Uuid>)> {
        std::mem::take(
            &mut *self.published.lock().expect("notifier poisoned"),
        )
    }
}

impl TaskNotifier for RecordingNotifier {
    fn publish(&self, event: TaskEvent, origin: Option<Uuid>) {
        self.published
            .lock()
            .expect("notifier poisoned")
            .push((event, origin));
    }
}
