/// Task endpoints
///
/// All routes sit behind the session gate; the caller's [`AuthContext`]
/// decides visibility and permissions inside the task service.
///
/// # Endpoints
///
/// - `GET /api/tasks?status=<label>&date=YYYY-MM-DD` - List visible tasks
/// - `POST /api/tasks` - Create (ADMIN)
/// - `GET /api/tasks/summary` - Counts per status
/// - `GET /api/tasks/:id` - Fetch one
/// - `PUT /api/tasks/:id` - Full update (ADMIN)
/// - `PATCH /api/tasks/:id/status` - Status change (ADMIN or assignee)
/// - `DELETE /api/tasks/:id` - Delete (ADMIN)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use taskdesk_shared::{
    auth::middleware::AuthContext,
    models::task::{StatusSummary, Task, TaskFilter},
    services::{tasks::parse_status, StatusChange, TaskChanges, TaskDraft},
};

/// Query string of the list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    /// Exact status label, e.g. `On Progress`
    pub status: Option<String>,

    /// Creation day, `YYYY-MM-DD`
    pub date: Option<String>,
}

impl TaskQuery {
    fn into_filter(self) -> ApiResult<TaskFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(parse_status(label)?),
        };

        let created_on = match self.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(day) => Some(NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("Invalid date '{day}': expected YYYY-MM-DD"))
            })?),
        };

        Ok(TaskFilter { status, created_on })
    }
}

/// Parses the `:id` path segment; anything but a positive integer is rejected
fn task_id(path: Result<Path<String>, PathRejection>) -> ApiResult<i64> {
    let Path(raw) = path?;

    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest("Task ID is required".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let tasks = state.tasks.list_tasks(&auth, filter).await?;
    Ok(Json(tasks))
}

pub async fn task_summary(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<StatusSummary>> {
    Ok(Json(state.tasks.summarize(&auth).await?))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Content-Type: application/json
///
/// {
///   "title": "Fix bug",
///   "description": "desc",
///   "status": "New Assigned",
///   "assignedTo": 2,
///   "dueDate": "2025-06-01"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, unknown status, unknown assignee
/// - `403 Forbidden`: caller is not an admin
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<TaskDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(draft) = payload?;

    let task = state.tasks.create_task(&auth, draft).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let id = task_id(path)?;
    Ok(Json(state.tasks.get_task(&auth, id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<TaskChanges>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = task_id(path)?;
    let Json(changes) = payload?;

    Ok(Json(state.tasks.update_task(&auth, id, changes).await?))
}

/// Move a task to another status
///
/// Body: `{ "status": "Completed", "expectedVersion": 3 }`; the version is
/// optional and, when given, must match the stored one (else `409`).
pub async fn update_task_status(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = task_id(path)?;
    let Json(change) = payload?;

    Ok(Json(state.tasks.update_task_status(&auth, id, change).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = task_id(path)?;
    state.tasks.delete_task(&auth, id).await?;

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_shared::models::task::TaskStatus;

    #[test]
    fn test_query_into_filter() {
        let filter = TaskQuery {
            status: Some("On Progress".to_string()),
            date: Some("2025-03-04".to_string()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, Some(TaskStatus::OnProgress));
        assert_eq!(filter.created_on, NaiveDate::from_ymd_opt(2025, 3, 4));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let filter = TaskQuery {
            status: Some(String::new()),
            date: None,
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter, TaskFilter::default());
    }

    #[test]
    fn test_query_rejects_unknown_values() {
        let bad_status = TaskQuery {
            status: Some("done".to_string()),
            date: None,
        };
        assert!(bad_status.into_filter().is_err());

        let bad_date = TaskQuery {
            status: None,
            date: Some("04/03/2025".to_string()),
        };
        assert!(bad_date.into_filter().is_err());
    }

    #[test]
    fn test_task_id_parsing() {
        assert_eq!(task_id(Ok(Path("12".to_string()))).unwrap(), 12);
        assert!(task_id(Ok(Path("0".to_string()))).is_err());
        assert!(task_id(Ok(Path("abc".to_string()))).is_err());
    }
}
