/// Task model and database operations
///
/// Tasks are the core entity of TaskDesk: a unit of assigned work with a
/// title, description, status, assignee, creator and due date.
///
/// # Status
///
/// ```text
/// New Assigned ─> Pending ─> On Progress ─> Completed
/// ```
///
/// The arrow only shows the usual order. Status is a classification label,
/// not a guarded workflow: any of the four values may be set from any other,
/// including backwards (`Completed` → `Pending`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL,
///     status TEXT NOT NULL,
///     assigned_to BIGINT NOT NULL REFERENCES users(id),
///     created_by BIGINT NOT NULL REFERENCES users(id),
///     due_date DATE NOT NULL,
///     version BIGINT NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     CHECK (updated_at >= created_at)
/// );
/// ```

use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Task status label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Initial status of a freshly created task
    #[default]
    #[serde(rename = "New Assigned")]
    NewAssigned,

    #[serde(rename = "Pending")]
    Pending,

    #[serde(rename = "On Progress")]
    OnProgress,

    /// Terminal in the usual order, but may still be reopened
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    /// Every status, in the usual order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NewAssigned,
        TaskStatus::Pending,
        TaskStatus::OnProgress,
        TaskStatus::Completed,
    ];

    /// Converts status to the label used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NewAssigned => "New Assigned",
            TaskStatus::Pending => "Pending",
            TaskStatus::OnProgress => "On Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status label is not one of the four defined values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status '{0}': expected one of New Assigned, Pending, On Progress, Completed")]
pub struct ParseStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID, never changes
    pub id: i64,

    pub title: String,

    pub description: String,

    pub status: TaskStatus,

    /// User the task is assigned to
    pub assigned_to: i64,

    /// User who created the task, immutable
    pub created_by: i64,

    pub due_date: NaiveDate,

    /// Mutation counter used for conditional updates, starts at 1
    pub version: i64,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation, always >= `created_at`
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task (validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: i64,
    pub created_by: i64,
    pub due_date: NaiveDate,

    /// Used for both `created_at` and `updated_at`
    pub created_at: DateTime<Utc>,
}

/// Full overwrite of the editable task fields (validated)
///
/// `created_by` and `created_at` are absent on purpose: they are immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: i64,
    pub due_date: NaiveDate,

    /// Candidate `updated_at`; see [`next_updated_at`]
    pub updated_at: DateTime<Utc>,

    /// When set, the write only applies if the stored version matches
    pub expected_version: Option<i64>,
}

/// Status-only change (validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,
    pub expected_version: Option<i64>,
}

/// Current time at the precision the store keeps (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Picks the `updated_at` for a mutation so that it strictly increases
///
/// Returns `candidate` unless it is not after `previous`, in which case the
/// result is one microsecond past `previous`.
pub fn next_updated_at(previous: DateTime<Utc>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    if candidate > previous {
        candidate
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Which tasks a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Every task (administrators)
    All,

    /// Only tasks assigned to this user
    AssignedTo(i64),
}

impl TaskScope {
    pub fn includes(&self, task: &Task) -> bool {
        match self {
            TaskScope::All => true,
            TaskScope::AssignedTo(user_id) => task.assigned_to == *user_id,
        }
    }
}

/// Display filter over an already-visible set of tasks
///
/// Pure predicate: status is an exact match, `created_on` matches tasks
/// whose `created_at` falls on that UTC calendar day. Unset fields match
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub created_on: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = self.status.map_or(true, |status| task.status == status);
        let date_ok = self
            .created_on
            .map_or(true, |day| task.created_at.date_naive() == day);

        status_ok && date_ok
    }

    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}

/// Per-status counters for a set of tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub new_assigned: usize,
    pub pending: usize,
    pub on_progress: usize,
    pub completed: usize,
    pub total: usize,
}

impl StatusSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut summary, task| {
            match task.status {
                TaskStatus::NewAssigned => summary.new_assigned += 1,
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::OnProgress => summary.on_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
            }
            summary.total += 1;
            summary
        })
    }
}

/// Raw `tasks` row; `status` is decoded into [`TaskStatus`] afterwards
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: String,
    status: String,
    assigned_to: i64,
    created_by: i64,
    due_date: NaiveDate,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = sqlx::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            assigned_to: row.assigned_to,
            created_by: row.created_by,
            due_date: row.due_date,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, assigned_to, created_by, \
                            due_date, version, created_at, updated_at";

impl Task {
    /// Inserts a new task with `created_at = updated_at`
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, assigned_to, created_by,
                               due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.as_str())
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(data.due_date)
        .bind(data.created_at)
        .fetch_one(pool)
        .await?;

        row.try_into()
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    /// Lists tasks within a visibility scope, oldest first
    pub async fn list(pool: &PgPool, scope: TaskScope) -> Result<Vec<Self>, sqlx::Error> {
        let rows = match scope {
            TaskScope::All => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"
                ))
                .fetch_all(pool)
                .await?
            }
            TaskScope::AssignedTo(user_id) => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = $1 ORDER BY id ASC"
                ))
                .bind(user_id)
                .fetch_all(pool)
                .await?
            }
        };

        rows.into_iter().map(Task::try_from).collect()
    }

    /// Overwrites the editable fields
    ///
    /// Returns `None` when no row matched, either because the task does not
    /// exist or because `expected_version` is stale; callers tell the two
    /// apart with [`Task::current_version`].
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                status = $4,
                assigned_to = $5,
                due_date = $6,
                updated_at = GREATEST($7, updated_at + INTERVAL '1 microsecond'),
                version = version + 1
            WHERE id = $1 AND ($8::BIGINT IS NULL OR version = $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.as_str())
        .bind(data.assigned_to)
        .bind(data.due_date)
        .bind(data.updated_at)
        .bind(data.expected_version)
        .fetch_optional(pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    /// Changes only the status, leaving every other field untouched
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        data: UpdateTaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET status = $2,
                updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond'),
                version = version + 1
            WHERE id = $1 AND ($4::BIGINT IS NULL OR version = $4)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.status.as_str())
        .bind(data.updated_at)
        .bind(data.expected_version)
        .fetch_optional(pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    /// Reads the stored version of a task, `None` if it does not exist
    pub async fn current_version(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task permanently
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
