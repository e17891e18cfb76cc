//! Events broadcast to a user's private channel after a committed mutation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::Task;

/// One committed mutation, as delivered to every other connected session of
/// the owning user (and to authorized admin observers).
///
/// Events are published strictly after the store transaction commits and are
/// best-effort: a delivery failure never affects committed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    TaskCreated {
        task: Task,
    },
    TaskUpdated {
        task: Task,
    },
    TaskDeleted {
        task_id: Uuid,
        owner_id: Uuid,
    },
    TasksReordered {
        owner_id: Uuid,
        #[serde(rename = "order")]
        mapping: HashMap<Uuid, i32>,
    },
}

impl TaskEvent {
    /// The private channel this event belongs to.
    pub fn owner_id(&self) -> Uuid {
        match self {
            Self::TaskCreated { task } | Self::TaskUpdated { task } => {
                task.owner_id
            }
            Self::TaskDeleted { owner_id, .. }
            | Self::TasksReordered { owner_id, .. } => *owner_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_type() {
        let owner_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let value = serde_json::to_value(TaskEvent::TaskDeleted {
            task_id,
            owner_id,
        })
        .unwrap();

        assert_eq!(value["type"], "task_deleted");
        assert_eq!(value["owner_id"], owner_id.to_string());
    }

    #[test]
    fn reorder_mapping_serializes_as_order() {
        let owner_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let event = TaskEvent::TasksReordered {
            owner_id,
            mapping: HashMap::from([(task_id, 3)]),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["order"][task_id.to_string()], 3);

        let back: TaskEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
