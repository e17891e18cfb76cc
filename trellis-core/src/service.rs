//! The task service: the single authority every other layer calls into.
//!
//! Each call takes the authenticated actor explicitly; there is no
//! ambient "current user" anywhere. Mutations run policy first (a denial
//! short-circuits before the store is touched), then the store operation,
//! and publish to the notifier strictly after the store has committed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use trellis_model::{
    NewTask, Task, TaskEvent, TaskFilter, TaskPatch, TaskStatistics, User,
};
use uuid::Uuid;

use crate::database::ports::TaskStore;
use crate::error::{Result, TaskError};
use crate::notify::TaskNotifier;
use crate::policy::{TaskAccess, TaskAction};

/// Orchestrates policy checks, store operations, and post-commit fan-out.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn TaskNotifier>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn TaskNotifier>,
    ) -> Self {
        Self { store, notifier }
    }

    /// The actor's own tasks, ordered by the order key. The query is
    /// pre-scoped to `actor.id`, so authorization is implicit here.
    pub async fn list_tasks(
        &self,
        actor: &User,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>> {
        self.store.list(actor.id, filter).await
    }

    /// Validate and append a task to the end of the actor's list.
    pub async fn create_task(
        &self,
        actor: &User,
        new_task: &NewTask,
        origin: Option<Uuid>,
    ) -> Result<Task> {
        new_task.validate().map_err(TaskError::Validation)?;

        let task = self.store.append(actor.id, new_task).await?;
        info!(task_id = %task.id, owner_id = %actor.id, "task created");
        self.notifier
            .publish(TaskEvent::TaskCreated { task: task.clone() }, origin);
        Ok(task)
    }

    /// Fetch a single task the actor may view. Absent tasks are
    /// `NotFound`; existing tasks the actor may not see are `Forbidden`,
    /// consistently, so existence is never revealed by accident.
    pub async fn get_task(&self, actor: &User, task_id: Uuid) -> Result<Task> {
        let task = self
            .store
            .find(task_id)
            .await?
            .ok_or(TaskError::NotFound("task"))?;
        authorize(actor, &task, TaskAction::View)?;
        Ok(task)
    }

    /// Patch a task the actor may update. The order key is never touched
    /// by this path.
    pub async fn update_task(
        &self,
        actor: &User,
        task_id: Uuid,
        patch: &TaskPatch,
        origin: Option<Uuid>,
    ) -> Result<Task> {
        let task = self
            .store
            .find(task_id)
            .await?
            .ok_or(TaskError::NotFound("task"))?;
        authorize(actor, &task, TaskAction::Update)?;
        patch.validate().map_err(TaskError::Validation)?;

        let task = self.store.update(task_id, patch).await?;
        info!(task_id = %task.id, owner_id = %task.owner_id, "task updated");
        self.notifier
            .publish(TaskEvent::TaskUpdated { task: task.clone() }, origin);
        Ok(task)
    }

    /// Delete a task the actor may delete. Remaining order values keep
    /// their gaps until the owner reorders.
    pub async fn delete_task(
        &self,
        actor: &User,
        task_id: Uuid,
        origin: Option<Uuid>,
    ) -> Result<()> {
        let task = self
            .store
            .find(task_id)
            .await?
            .ok_or(TaskError::NotFound("task"))?;
        authorize(actor, &task, TaskAction::Delete)?;

        self.store.delete(task_id).await?;
        info!(task_id = %task_id, owner_id = %task.owner_id, "task deleted");
        self.notifier.publish(
            TaskEvent::TaskDeleted {
                task_id,
                owner_id: task.owner_id,
            },
            origin,
        );
        Ok(())
    }

    /// Apply an order mapping to the actor's own list. Always self-scoped:
    /// unlike view/update/delete there is no admin override, so an admin's
    /// mapping that names another user's task is rejected like anyone
    /// else's.
    pub async fn reorder_tasks(
        &self,
        actor: &User,
        mapping: &HashMap<Uuid, i32>,
        origin: Option<Uuid>,
    ) -> Result<()> {
        if mapping.is_empty() {
            return Err(TaskError::validation(
                "tasks",
                "task order data is required",
            ));
        }
        if mapping.values().any(|order| *order < 0) {
            return Err(TaskError::validation(
                "tasks",
                "each task order must be a non-negative integer",
            ));
        }

        self.store.reorder(actor.id, mapping).await?;
        info!(owner_id = %actor.id, moved = mapping.len(), "tasks reordered");
        self.notifier.publish(
            TaskEvent::TasksReordered {
                owner_id: actor.id,
                mapping: mapping.clone(),
            },
            origin,
        );
        Ok(())
    }

    /// Aggregate counts over the actor's own tasks.
    pub async fn get_statistics(&self, actor: &User) -> Result<TaskStatistics> {
        self.store.statistics(actor.id).await
    }

    /// Aggregate counts over `user_id`'s tasks; permitted for the user
    /// themselves and for admins.
    pub async fn get_user_statistics(
        &self,
        actor: &User,
        user_id: Uuid,
    ) -> Result<TaskStatistics> {
        TaskAccess::resolve(actor, user_id).ok_or(TaskError::Forbidden)?;
        self.store.statistics(user_id).await
    }
}

fn authorize(actor: &User, task: &Task, action: TaskAction) -> Result<()> {
    TaskAccess::resolve(actor, task.owner_id)
        .filter(|access| access.permits(action))
        .map(|_| ())
        .ok_or(TaskError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryTaskStore, RecordingNotifier, test_user};
    use trellis_model::{TaskPriority, TaskStatus};

    fn service() -> (TaskService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = TaskService::new(
            Arc::new(InMemoryTaskStore::default()),
            notifier.clone(),
        );
        (service, notifier)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        }
    }

    fn status_patch(status: TaskStatus) -> TaskPatch {
        TaskPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn appends_assign_a_dense_order_sequence() {
        let (service, _) = service();
        let user = test_user("ana", false);

        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            let task = service
                .create_task(&user, &new_task(title), None)
                .await
                .unwrap();
            assert_eq!(task.sort_order, i as i32);
        }

        let orders: Vec<i32> = service
            .list_tasks(&user, &TaskFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|t| t.sort_order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_then_delete_leaves_pre_delete_orders() {
        let (service, _) = service();
        let user = test_user("ana", false);

        let a = service.create_task(&user, &new_task("a"), None).await.unwrap();
        let b = service.create_task(&user, &new_task("b"), None).await.unwrap();
        let c = service.create_task(&user, &new_task("c"), None).await.unwrap();

        let mapping = HashMap::from([(c.id, 0), (a.id, 1), (b.id, 2)]);
        service.reorder_tasks(&user, &mapping, None).await.unwrap();

        let titles: Vec<String> = service
            .list_tasks(&user, &TaskFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["c", "a", "b"]);

        // Delete does not compact: c and a keep their pre-delete orders.
        service.delete_task(&user, b.id, None).await.unwrap();
        let remaining: Vec<(String, i32)> = service
            .list_tasks(&user, &TaskFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.title, t.sort_order))
            .collect();
        assert_eq!(remaining, vec![("c".to_string(), 0), ("a".to_string(), 1)]);
    }

    #[tokio::test]
    async fn delete_in_the_middle_leaves_a_gap() {
        let (service, _) = service();
        let user = test_user("ana", false);

        let _a = service.create_task(&user, &new_task("a"), None).await.unwrap();
        let b = service.create_task(&user, &new_task("b"), None).await.unwrap();
        let _c = service.create_task(&user, &new_task("c"), None).await.unwrap();

        service.delete_task(&user, b.id, None).await.unwrap();

        let orders: Vec<i32> = service
            .list_tasks(&user, &TaskFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|t| t.sort_order)
            .collect();
        assert_eq!(orders, vec![0, 2]);
    }

    #[tokio::test]
    async fn stranger_is_forbidden_and_admin_is_not() {
        let (service, _) = service();
        let owner = test_user("ana", false);
        let stranger = test_user("bob", false);
        let admin = test_user("root", true);

        let task =
            service.create_task(&owner, &new_task("a"), None).await.unwrap();

        assert!(matches!(
            service.get_task(&stranger, task.id).await,
            Err(TaskError::Forbidden)
        ));
        assert!(matches!(
            service
                .update_task(&stranger, task.id, &status_patch(TaskStatus::Completed), None)
                .await,
            Err(TaskError::Forbidden)
        ));
        assert!(matches!(
            service.delete_task(&stranger, task.id, None).await,
            Err(TaskError::Forbidden)
        ));

        assert!(service.get_task(&admin, task.id).await.is_ok());
        assert!(
            service
                .update_task(&admin, task.id, &status_patch(TaskStatus::InProgress), None)
                .await
                .is_ok()
        );
        assert!(service.delete_task(&admin, task.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn absent_task_is_not_found_not_forbidden() {
        let (service, _) = service();
        let user = test_user("ana", false);

        assert!(matches!(
            service.get_task(&user, Uuid::new_v4()).await,
            Err(TaskError::NotFound("task"))
        ));
    }

    #[tokio::test]
    async fn foreign_id_rejects_the_whole_mapping() {
        let (service, _) = service();
        let ana = test_user("ana", false);
        let bob = test_user("bob", false);

        let mine =
            service.create_task(&ana, &new_task("mine"), None).await.unwrap();
        let theirs =
            service.create_task(&bob, &new_task("theirs"), None).await.unwrap();

        let mapping = HashMap::from([(mine.id, 1), (theirs.id, 0)]);
        let err =
            service.reorder_tasks(&ana, &mapping, None).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));

        // No partial application: both lists are untouched.
        let ana_task = service.get_task(&ana, mine.id).await.unwrap();
        assert_eq!(ana_task.sort_order, 0);
        let bob_task = service.get_task(&bob, theirs.id).await.unwrap();
        assert_eq!(bob_task.sort_order, 0);
    }

    #[tokio::test]
    async fn reorder_is_self_scoped_even_for_admins() {
        let (service, _) = service();
        let ana = test_user("ana", false);
        let admin = test_user("root", true);

        let task =
            service.create_task(&ana, &new_task("a"), None).await.unwrap();

        // The admin's mapping is applied against the admin's own (empty)
        // list, so ana's task id is foreign to it.
        let err = service
            .reorder_tasks(&admin, &HashMap::from([(task.id, 0)]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn reorder_rejects_empty_and_negative_mappings() {
        let (service, notifier) = service();
        let user = test_user("ana", false);
        let task =
            service.create_task(&user, &new_task("a"), None).await.unwrap();
        notifier.take();

        assert!(matches!(
            service.reorder_tasks(&user, &HashMap::new(), None).await,
            Err(TaskError::Validation(_))
        ));
        assert!(matches!(
            service
                .reorder_tasks(&user, &HashMap::from([(task.id, -1)]), None)
                .await,
            Err(TaskError::Validation(_))
        ));
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn completing_and_reopening_manages_the_timestamp() {
        let (service, _) = service();
        let user = test_user("ana", false);
        let task =
            service.create_task(&user, &new_task("a"), None).await.unwrap();
        assert_eq!(task.completed_at, None);

        let done = service
            .update_task(&user, task.id, &status_patch(TaskStatus::Completed), None)
            .await
            .unwrap();
        let first_stamp = done.completed_at.unwrap();

        let reopened = service
            .update_task(&user, task.id, &status_patch(TaskStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(reopened.completed_at, None);

        let done_again = service
            .update_task(&user, task.id, &status_patch(TaskStatus::Completed), None)
            .await
            .unwrap();
        assert!(done_again.completed_at.unwrap() >= first_stamp);
        assert_ne!(done_again.updated_at, task.updated_at);
    }

    #[tokio::test]
    async fn list_filters_narrow_by_status_priority_and_search() {
        let (service, _) = service();
        let user = test_user("ana", false);

        service
            .create_task(
                &user,
                &NewTask {
                    title: "Write report".into(),
                    description: Some("quarterly numbers".into()),
                    status: TaskStatus::Pending,
                    priority: TaskPriority::High,
                },
                None,
            )
            .await
            .unwrap();
        service
            .create_task(
                &user,
                &NewTask {
                    title: "groceries".into(),
                    description: None,
                    status: TaskStatus::Completed,
                    priority: TaskPriority::Low,
                },
                None,
            )
            .await
            .unwrap();

        let completed = service
            .list_tasks(
                &user,
                &TaskFilter {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "groceries");

        let high = service
            .list_tasks(
                &user,
                &TaskFilter {
                    priority: Some(TaskPriority::High),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(high.len(), 1);

        // Case-insensitive, matches description too.
        let report = service
            .list_tasks(
                &user,
                &TaskFilter {
                    search: Some("REPORT".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(report.len(), 1);
        let numbers = service
            .list_tasks(
                &user,
                &TaskFilter {
                    search: Some("Numbers".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(numbers.len(), 1);
    }

    #[tokio::test]
    async fn statistics_are_isolated_per_user() {
        let (service, _) = service();
        let ana = test_user("ana", false);
        let bob = test_user("bob", false);

        for title in ["a", "b", "c"] {
            service.create_task(&ana, &new_task(title), None).await.unwrap();
        }
        for title in ["x", "y", "z"] {
            service.create_task(&bob, &new_task(title), None).await.unwrap();
        }

        let stats = service.get_statistics(&ana).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.by_priority.medium, 3);
    }

    #[tokio::test]
    async fn statistics_for_another_user_need_admin() {
        let (service, _) = service();
        let ana = test_user("ana", false);
        let bob = test_user("bob", false);
        let admin = test_user("root", true);

        service.create_task(&ana, &new_task("a"), None).await.unwrap();

        assert!(matches!(
            service.get_user_statistics(&bob, ana.id).await,
            Err(TaskError::Forbidden)
        ));
        let stats = service.get_user_statistics(&admin, ana.id).await.unwrap();
        assert_eq!(stats.total, 1);
        let own = service.get_user_statistics(&ana, ana.id).await.unwrap();
        assert_eq!(own.total, 1);
    }

    #[tokio::test]
    async fn mutations_publish_events_with_the_origin() {
        let (service, notifier) = service();
        let user = test_user("ana", false);
        let origin = Uuid::now_v7();

        let task = service
            .create_task(&user, &new_task("a"), Some(origin))
            .await
            .unwrap();
        service
            .update_task(
                &user,
                task.id,
                &status_patch(TaskStatus::Completed),
                Some(origin),
            )
            .await
            .unwrap();
        service
            .reorder_tasks(&user, &HashMap::from([(task.id, 0)]), Some(origin))
            .await
            .unwrap();
        service.delete_task(&user, task.id, Some(origin)).await.unwrap();

        let published = notifier.take();
        assert_eq!(published.len(), 4);
        assert!(matches!(published[0].0, TaskEvent::TaskCreated { .. }));
        assert!(matches!(published[1].0, TaskEvent::TaskUpdated { .. }));
        assert!(matches!(published[2].0, TaskEvent::TasksReordered { .. }));
        assert!(matches!(published[3].0, TaskEvent::TaskDeleted { .. }));
        for (event, event_origin) in &published {
            assert_eq!(event.owner_id(), user.id);
            assert_eq!(*event_origin, Some(origin));
        }
    }

    #[tokio::test]
    async fn failed_mutations_publish_nothing() {
        let (service, notifier) = service();
        let owner = test_user("ana", false);
        let stranger = test_user("bob", false);

        let task =
            service.create_task(&owner, &new_task("a"), None).await.unwrap();
        notifier.take();

        let invalid = NewTask {
            title: String::new(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        };
        assert!(service.create_task(&owner, &invalid, None).await.is_err());
        assert!(service.delete_task(&stranger, task.id, None).await.is_err());
        assert!(
            service
                .update_task(
                    &stranger,
                    task.id,
                    &status_patch(TaskStatus::Completed),
                    None
                )
                .await
                .is_err()
        );

        assert!(notifier.take().is_empty());
    }
}
