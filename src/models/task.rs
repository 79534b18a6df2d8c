use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const MAX_PRIORITY: i16 = 10;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Completed,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Maximum length of 1000 characters.
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,

    /// 0 to 10, defaults to 0.
    #[validate(range(min = 0, max = 10))]
    pub priority: Option<i16>,

    /// Defaults to `pending`.
    pub status: Option<TaskStatus>,
}

/// Payload for a partial task update. Only fields that are present and non-empty
/// are applied.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 10))]
    pub priority: Option<i16>,
    pub status: Option<TaskStatus>,
}

impl UpdateTaskRequest {
    pub fn into_changes(self) -> TaskChanges {
        TaskChanges {
            title: self.title.filter(|t| !t.trim().is_empty()),
            description: self.description.filter(|d| !d.trim().is_empty()),
            priority: self.priority,
            status: self.status,
        }
    }
}

/// The set of task columns an update will write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i16>,
    pub status: Option<TaskStatus>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    /// `completed_at` follows status: stamped on completion, cleared otherwise.
    /// `None` means the status is not being changed.
    pub fn completed_at(&self, now: DateTime<Utc>) -> Option<Option<DateTime<Utc>>> {
        self.status
            .map(|status| (status == TaskStatus::Completed).then_some(now))
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    /// Identifier of the account that owns the task.
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub priority: i16,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated task ready to be inserted for its owner.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: i16,
    pub status: TaskStatus,
}

impl From<TaskInput> for NewTask {
    fn from(input: TaskInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            priority: input.priority.unwrap_or(0),
            status: input.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
    PriorityAsc,
    PriorityDesc,
}

impl TaskSort {
    /// Unknown values fall back to newest first.
    pub fn parse(value: &str) -> Self {
        match value {
            "created_at:asc" => TaskSort::CreatedAtAsc,
            "created_at:desc" => TaskSort::CreatedAtDesc,
            "priority:asc" => TaskSort::PriorityAsc,
            "priority:desc" => TaskSort::PriorityDesc,
            _ => TaskSort::default(),
        }
    }

    pub fn order_by(self) -> &'static str {
        match self {
            TaskSort::CreatedAtAsc => "created_at ASC, id ASC",
            TaskSort::CreatedAtDesc => "created_at DESC, id DESC",
            TaskSort::PriorityAsc => "priority ASC, id ASC",
            TaskSort::PriorityDesc => "priority DESC, id DESC",
        }
    }
}

/// Represents query parameters for listing the caller's tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub sort: Option<String>,
}

/// Normalized listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskListParams {
    pub page: u32,
    pub limit: u32,
    pub status: Option<TaskStatus>,
    pub sort: TaskSort,
}

impl TaskListParams {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl From<&TaskQuery> for TaskListParams {
    fn from(query: &TaskQuery) -> Self {
        let page = query.page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = query
            .limit
            .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        Self {
            page,
            limit,
            status: query.status,
            sort: query.sort.as_deref().map(TaskSort::parse).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub meta: PageMeta,
}
