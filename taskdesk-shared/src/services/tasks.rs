/// Task lifecycle
///
/// Every operation takes the caller's [`AuthContext`] and enforces the
/// visibility and mutation rules before the store is touched:
///
/// | Operation        | Who                     |
/// |------------------|-------------------------|
/// | list / get / summary | anyone, within their visibility scope |
/// | create           | ADMIN                   |
/// | full update      | ADMIN                   |
/// | status change    | ADMIN or the assignee   |
/// | delete           | ADMIN                   |
///
/// Request bodies arrive as loosely typed drafts (every field optional) so
/// that an absent field yields the uniform `"Missing required fields"`
/// validation error instead of a deserializer message.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::authorization::{can_view_task, require_admin, require_status_change, visibility_scope};
use crate::auth::middleware::AuthContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::task::{
    now, CreateTask, StatusSummary, Task, TaskFilter, TaskStatus, UpdateTask, UpdateTaskStatus,
};
use crate::repository::{Missing, RepositoryError, TaskRepository, UserRepository};

/// Body of a create request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<i64>,

    /// Accepted for compatibility; the creator is always the caller
    pub created_by: Option<i64>,

    pub due_date: Option<String>,
}

/// Body of a full update request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    /// Optional echo of the path ID; must match when present
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<i64>,
    pub due_date: Option<String>,
    pub expected_version: Option<i64>,
}

/// Body of a status-only change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: Option<String>,
    pub expected_version: Option<i64>,
}

/// Non-blank string, trimmed
fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Positive user reference
fn required_id(value: Option<i64>) -> Option<i64> {
    value.filter(|id| *id > 0)
}

/// Parses a status label, rejecting anything but the four defined values
pub fn parse_status(label: &str) -> ServiceResult<TaskStatus> {
    label
        .trim()
        .parse::<TaskStatus>()
        .map_err(|e| ServiceError::Validation(e.to_string()))
}

/// Parses a due date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
///
/// Timestamps are reduced to their UTC calendar date.
pub fn parse_due_date(value: &str) -> ServiceResult<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| {
            ServiceError::Validation(format!(
                "Invalid dueDate '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}

/// Fields shared by create and full update, after validation
struct ValidFields {
    title: String,
    description: String,
    status: TaskStatus,
    assigned_to: i64,
    due_date: NaiveDate,
}

fn validate_fields(
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    assigned_to: Option<i64>,
    due_date: Option<String>,
) -> ServiceResult<ValidFields> {
    let (Some(title), Some(description), Some(status), Some(assigned_to), Some(due_date)) = (
        required_text(title),
        required_text(description),
        required_text(status),
        required_id(assigned_to),
        required_text(due_date),
    ) else {
        return Err(ServiceError::missing_fields());
    };

    Ok(ValidFields {
        title,
        description,
        status: parse_status(&status)?,
        assigned_to,
        due_date: parse_due_date(&due_date)?,
    })
}

/// Task operations over injected repositories
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tasks, users }
    }

    async fn ensure_assignee_exists(&self, user_id: i64) -> ServiceResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(Missing::AssignedUser)),
        }
    }

    /// Tasks visible to the caller, narrowed by `filter`
    pub async fn list_tasks(&self, auth: &AuthContext, filter: TaskFilter) -> ServiceResult<Vec<Task>> {
        let visible = self.tasks.list(visibility_scope(auth)).await?;
        let tasks = filter.apply(visible);

        debug!(user_id = auth.user_id, count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    /// Per-status counts over the caller's visible tasks
    pub async fn summarize(&self, auth: &AuthContext) -> ServiceResult<StatusSummary> {
        let visible = self.tasks.list(visibility_scope(auth)).await?;
        Ok(StatusSummary::from_tasks(&visible))
    }

    /// A single task, if the caller may see it
    ///
    /// Tasks outside the caller's scope are reported as not found.
    pub async fn get_task(&self, auth: &AuthContext, id: i64) -> ServiceResult<Task> {
        self.tasks
            .find_by_id(id)
            .await?
            .filter(|task| can_view_task(auth, task))
            .ok_or(ServiceError::NotFound(Missing::Task(id)))
    }

    pub async fn create_task(&self, auth: &AuthContext, draft: TaskDraft) -> ServiceResult<Task> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, "Rejected task creation by non-admin");
            return Err(e.into());
        }

        if let Some(claimed) = draft.created_by {
            if claimed != auth.user_id {
                warn!(
                    user_id = auth.user_id,
                    claimed_creator = claimed,
                    "Ignoring createdBy from request body"
                );
            }
        }

        let fields = validate_fields(
            draft.title,
            draft.description,
            draft.status,
            draft.assigned_to,
            draft.due_date,
        )?;
        self.ensure_assignee_exists(fields.assigned_to).await?;

        let task = self
            .tasks
            .insert(CreateTask {
                title: fields.title,
                description: fields.description,
                status: fields.status,
                assigned_to: fields.assigned_to,
                created_by: auth.user_id,
                due_date: fields.due_date,
                created_at: now(),
            })
            .await?;

        info!(
            task_id = task.id,
            assigned_to = task.assigned_to,
            created_by = task.created_by,
            "Task created"
        );
        Ok(task)
    }

    /// Overwrites title, description, status, assignee and due date
    pub async fn update_task(
        &self,
        auth: &AuthContext,
        id: i64,
        changes: TaskChanges,
    ) -> ServiceResult<Task> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, task_id = id, "Rejected task update by non-admin");
            return Err(e.into());
        }

        if let Some(body_id) = changes.id {
            if body_id != id {
                return Err(ServiceError::Validation(format!(
                    "Task ID in body ({body_id}) does not match the path ({id})"
                )));
            }
        }

        let fields = validate_fields(
            changes.title,
            changes.description,
            changes.status,
            changes.assigned_to,
            changes.due_date,
        )?;
        self.ensure_assignee_exists(fields.assigned_to).await?;

        let task = self
            .tasks
            .update(
                id,
                UpdateTask {
                    title: fields.title,
                    description: fields.description,
                    status: fields.status,
                    assigned_to: fields.assigned_to,
                    due_date: fields.due_date,
                    updated_at: now(),
                    expected_version: changes.expected_version,
                },
            )
            .await?;

        info!(task_id = task.id, version = task.version, "Task updated");
        Ok(task)
    }

    /// Changes only the status
    ///
    /// Allowed for admins and for the task's assignee. Any status may follow
    /// any other, including itself.
    ///
    /// An assignee's write is pinned to the version the permission check
    /// saw, so a reassignment that lands in between makes it fail with a
    /// conflict instead of going through.
    pub async fn update_task_status(
        &self,
        auth: &AuthContext,
        id: i64,
        change: StatusChange,
    ) -> ServiceResult<Task> {
        let status = required_text(change.status).ok_or_else(ServiceError::missing_fields)?;
        let status = parse_status(&status)?;

        let current = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(Missing::Task(id)))?;

        if let Err(e) = require_status_change(auth, &current) {
            warn!(
                user_id = auth.user_id,
                task_id = id,
                assigned_to = current.assigned_to,
                "Rejected status change by non-assignee"
            );
            return Err(e.into());
        }

        let expected_version = if auth.is_admin() {
            change.expected_version
        } else {
            match change.expected_version {
                Some(expected) if expected != current.version => {
                    return Err(RepositoryError::VersionConflict {
                        id,
                        expected,
                        found: current.version,
                    }
                    .into());
                }
                _ => Some(current.version),
            }
        };

        let task = self
            .tasks
            .update_status(
                id,
                UpdateTaskStatus {
                    status,
                    updated_at: now(),
                    expected_version,
                },
            )
            .await
            .map_err(|e| {
                if matches!(e, RepositoryError::VersionConflict { .. }) {
                    warn!(user_id = auth.user_id, task_id = id, "Status change lost to a concurrent write");
                }
                ServiceError::from(e)
            })?;

        info!(
            task_id = task.id,
            from = %current.status,
            to = %task.status,
            user_id = auth.user_id,
            "Task status changed"
        );
        Ok(task)
    }

    pub async fn delete_task(&self, auth: &AuthContext, id: i64) -> ServiceResult<()> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, task_id = id, "Rejected task deletion by non-admin");
            return Err(e.into());
        }

        self.tasks.delete(id).await?;

        info!(task_id = id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert_eq!(parse_due_date("2025-06-01").unwrap(), expected);
        assert_eq!(parse_due_date(" 2025-06-01 ").unwrap(), expected);
        assert_eq!(parse_due_date("2025-06-01T10:30:00Z").unwrap(), expected);

        // Late evening west of UTC is already the next UTC day
        assert_eq!(
            parse_due_date("2025-05-31T22:00:00-05:00").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_due_date_rejects_garbage() {
        for bad in ["", "tomorrow", "2025-13-01", "01/06/2025"] {
            assert!(
                matches!(parse_due_date(bad), Err(ServiceError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Pending").unwrap(), TaskStatus::Pending);
        assert!(matches!(parse_status("Done"), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_validate_fields_treats_blank_as_missing() {
        let result = validate_fields(
            Some("   ".to_string()),
            Some("desc".to_string()),
            Some("Pending".to_string()),
            Some(2),
            Some("2025-06-01".to_string()),
        );

        match result {
            Err(ServiceError::Validation(msg)) => assert_eq!(msg, "Missing required fields"),
            _ => panic!("blank title should be reported as missing"),
        }
    }

    #[test]
    fn test_validate_fields_rejects_non_positive_assignee() {
        let result = validate_fields(
            Some("t".to_string()),
            Some("d".to_string()),
            Some("Pending".to_string()),
            Some(0),
            Some("2025-06-01".to_string()),
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_draft_deserializes_camel_case() {
        let draft: TaskDraft = serde_json::from_str(
            r#"{"title":"Fix bug","assignedTo":2,"createdBy":1,"dueDate":"2025-06-01"}"#,
        )
        .unwrap();

        assert_eq!(draft.assigned_to, Some(2));
        assert_eq!(draft.created_by, Some(1));
        assert_eq!(draft.due_date.as_deref(), Some("2025-06-01"));
        assert!(draft.status.is_none());
    }
}
