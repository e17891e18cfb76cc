//! Task-level authorization.
//!
//! The policy is a pure function over the actor, the task's owner, and the
//! requested action. It runs before every owner-scoped mutation; a denial
//! short-circuits before the store is touched.

use trellis_model::{Task, User};
use uuid::Uuid;

/// Owner-scoped actions subject to the policy. Reordering is not listed:
/// it is always scoped to the acting user's own list and never crosses an
/// ownership boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    View,
    Update,
    Delete,
}

/// The capability an actor holds over a task, resolved once per call from
/// the closed role set rather than re-derived at each site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAccess {
    /// The actor owns the task.
    Owner,
    /// The actor is an administrator acting on someone else's task.
    Admin,
}

impl TaskAccess {
    /// Resolve the actor's capability over the given owner's resources.
    /// `None` means no access at all.
    pub fn resolve(actor: &User, owner_id: Uuid) -> Option<Self> {
        if actor.id == owner_id {
            Some(Self::Owner)
        } else if actor.is_admin {
            Some(Self::Admin)
        } else {
            None
        }
    }

    /// Whether this capability permits the action. Owners and admins both
    /// hold the full view/update/delete set today; the match stays
    /// exhaustive so narrowing either role is a local change.
    pub fn permits(self, action: TaskAction) -> bool {
        match (self, action) {
            (Self::Owner, TaskAction::View | TaskAction::Update | TaskAction::Delete) => true,
            (Self::Admin, TaskAction::View | TaskAction::Update | TaskAction::Delete) => true,
        }
    }
}

/// `true` iff `actor` may perform `action` on `task`: owner or admin.
pub fn can_access(actor: &User, task: &Task, action: TaskAction) -> bool {
    TaskAccess::resolve(actor, task.owner_id)
        .is_some_and(|access| access.permits(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_task, test_user};

    #[test]
    fn owner_holds_all_actions() {
        let owner = test_user("ana", false);
        let task = test_task(owner.id, "groceries", 0);

        for action in [TaskAction::View, TaskAction::Update, TaskAction::Delete] {
            assert!(can_access(&owner, &task, action));
        }
    }

    #[test]
    fn admin_overrides_ownership() {
        let owner = test_user("ana", false);
        let admin = test_user("root", true);
        let task = test_task(owner.id, "groceries", 0);

        for action in [TaskAction::View, TaskAction::Update, TaskAction::Delete] {
            assert!(can_access(&admin, &task, action));
        }
        assert_eq!(
            TaskAccess::resolve(&admin, task.owner_id),
            Some(TaskAccess::Admin)
        );
    }

    #[test]
    fn stranger_is_denied_everything() {
        let owner = test_user("ana", false);
        let stranger = test_user("bob", false);
        let task = test_task(owner.id, "groceries", 0);

        for action in [TaskAction::View, TaskAction::Update, TaskAction::Delete] {
            assert!(!can_access(&stranger, &task, action));
        }
        assert_eq!(TaskAccess::resolve(&stranger, task.owner_id), None);
    }
}
