//! Task rows, field validation, and the status transition rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Upper bound on title length, counted in characters.
pub const TITLE_MAX_CHARS: usize = 255;
/// Upper bound on description length, counted in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Lifecycle state of a task. Any state may transition to any other by
/// explicit client request; entering [`TaskStatus::Completed`] stamps
/// `completed_at` and leaving it clears the stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "task_status", rename_all = "snake_case")
)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Relative importance of a task. Purely informational; ordering within a
/// list is carried by the order key, not the priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "task_priority", rename_all = "snake_case")
)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single tracked task.
///
/// `sort_order` is the owner-scoped order key: non-negative, unique within
/// the owner's task set, and contiguous from 0 whenever no mutation is in
/// flight. It serializes as `order` on the wire. Deleting a task leaves a
/// gap on purpose; only a client-issued reorder rewrites the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Position within the owner's list.
    #[serde(rename = "order")]
    pub sort_order: i32,
    /// Set iff `status == Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Apply a patch in place, enforcing the `completed_at` invariant.
    ///
    /// Entering `Completed` stamps `completed_at = now`; leaving it clears
    /// the stamp. A round trip (completed → pending → completed) therefore
    /// yields a fresh timestamp, never the original one. The order key is
    /// never touched by this path.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            match (self.status, status) {
                (TaskStatus::Completed, TaskStatus::Completed) => {}
                (_, TaskStatus::Completed) => self.completed_at = Some(now),
                (_, _) => self.completed_at = None,
            }
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.updated_at = now;
    }
}

/// A single field-level validation failure, reported back to the client as
/// part of a 422 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Payload for creating a task. The order key is never client-supplied on
/// this path; the store appends at the end of the owner's list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

impl NewTask {
    /// Validate field bounds, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        check_title(&self.title, &mut violations);
        if let Some(description) = &self.description {
            check_description(description, &mut violations);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Partial update for a task. Absent fields are left unchanged; the
/// description distinguishes "absent" from an explicit `null` (which clears
/// it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

// Wraps present values (including null) in Some, so a missing key and an
// explicit null stay distinguishable after deserialization.
fn some_if_present<'de, D>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    /// Validate field bounds for every field that is present.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if let Some(title) = &self.title {
            check_title(title, &mut violations);
        }
        if let Some(Some(description)) = &self.description {
            check_description(description, &mut violations);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

fn check_title(title: &str, violations: &mut Vec<FieldViolation>) {
    if title.trim().is_empty() {
        violations.push(FieldViolation::new("title", "title is required"));
    } else if title.chars().count() > TITLE_MAX_CHARS {
        violations.push(FieldViolation::new(
            "title",
            format!("title cannot exceed {TITLE_MAX_CHARS} characters"),
        ));
    }
}

fn check_description(description: &str, violations: &mut Vec<FieldViolation>) {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        violations.push(FieldViolation::new(
            "description",
            format!(
                "description cannot exceed {DESCRIPTION_MAX_CHARS} characters"
            ),
        ));
    }
}

/// Optional narrowing filters for task listings. Status and priority match
/// exactly; `search` is a case-insensitive substring match across title and
/// description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub search: Option<String>,
}

impl TaskFilter {
    /// The search term with surrounding whitespace stripped, or `None` when
    /// the filter is absent or blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "write report".into(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            sort_order: 0,
            completed_at: match status {
                TaskStatus::Completed => Some(now),
                _ => None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        let new = NewTask {
            title: "   ".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        };
        let violations = new.validate().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "title");
    }

    #[test]
    fn title_boundary_at_255_chars() {
        let mut new = NewTask {
            title: "x".repeat(TITLE_MAX_CHARS),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        };
        assert!(new.validate().is_ok());

        new.title.push('x');
        assert!(new.validate().is_err());
    }

    #[test]
    fn description_boundary_at_1000_chars() {
        let mut new = NewTask {
            title: "t".into(),
            description: Some("d".repeat(DESCRIPTION_MAX_CHARS)),
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        };
        assert!(new.validate().is_ok());

        new.description.as_mut().unwrap().push('d');
        let violations = new.validate().unwrap_err();
        assert_eq!(violations[0].field, "description");
    }

    #[test]
    fn entering_completed_stamps_completed_at() {
        let mut t = task(TaskStatus::Pending);
        let now = Utc::now();
        t.apply(
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
            now,
        );
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.completed_at, Some(now));
    }

    #[test]
    fn leaving_completed_clears_completed_at() {
        let mut t = task(TaskStatus::Completed);
        t.apply(
            &TaskPatch {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn completed_round_trip_stamps_fresh_timestamp() {
        let mut t = task(TaskStatus::Completed);
        let original = t.completed_at;

        t.apply(
            &TaskPatch {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            },
            Utc::now() + chrono::Duration::seconds(1),
        );
        let later = Utc::now() + chrono::Duration::seconds(2);
        t.apply(
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
            later,
        );

        assert_eq!(t.completed_at, Some(later));
        assert_ne!(t.completed_at, original);
    }

    #[test]
    fn staying_completed_keeps_the_original_stamp() {
        let mut t = task(TaskStatus::Completed);
        let original = t.completed_at;
        t.apply(
            &TaskPatch {
                title: Some("renamed".into()),
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
            Utc::now() + chrono::Duration::seconds(5),
        );
        assert_eq!(t.completed_at, original);
        assert_eq!(t.title, "renamed");
    }

    #[test]
    fn patch_distinguishes_absent_from_null_description() {
        let absent: TaskPatch = serde_json::from_str(r#"{}"#).unwrap();
        assert!(absent.description.is_none());

        let cleared: TaskPatch =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: TaskPatch =
            serde_json::from_str(r#"{"description": "notes"}"#).unwrap();
        assert_eq!(set.description, Some(Some("notes".into())));
    }

    #[test]
    fn order_key_serializes_as_order() {
        let t = task(TaskStatus::Pending);
        let value = serde_json::to_value(&t).unwrap();
        assert!(value.get("order").is_some());
        assert!(value.get("sort_order").is_none());
    }

    #[test]
    fn blank_search_term_is_ignored() {
        let filter = TaskFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);

        let filter = TaskFilter {
            search: Some("  report ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), Some("report"));
    }
}
