/// PostgreSQL-backed repositories
///
/// Thin adapters over the model queries: they own the pool handle and turn
/// `sqlx` errors into [`RepositoryError`]s.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::{Missing, RepositoryError, RepositoryResult, TaskRepository, UserRepository};
use crate::models::task::{CreateTask, Task, TaskScope, UpdateTask, UpdateTaskStatus};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Repository over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes "gone" from "stale" after a conditional update matched
    /// no row
    async fn missed_update(&self, id: i64, expected: Option<i64>) -> RepositoryError {
        match Task::current_version(&self.pool, id).await {
            Ok(None) => RepositoryError::NotFound(Missing::Task(id)),
            Ok(Some(found)) => RepositoryError::VersionConflict {
                id,
                expected: expected.unwrap_or(found),
                found,
            },
            Err(e) => map_sqlx_error(e),
        }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return RepositoryError::Duplicate("email".to_string());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound(Missing::AssignedUser);
        }
    }

    error!(error = %err, "Database operation failed");
    RepositoryError::Database(err.to_string())
}

#[async_trait]
impl TaskRepository for PgRepository {
    async fn list(&self, scope: TaskScope) -> RepositoryResult<Vec<Task>> {
        Task::list(&self.pool, scope).await.map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        Task::find_by_id(&self.pool, id).await.map_err(map_sqlx_error)
    }

    async fn insert(&self, data: CreateTask) -> RepositoryResult<Task> {
        Task::create(&self.pool, data).await.map_err(map_sqlx_error)
    }

    async fn update(&self, id: i64, data: UpdateTask) -> RepositoryResult<Task> {
        let expected = data.expected_version;

        match Task::update(&self.pool, id, data).await.map_err(map_sqlx_error)? {
            Some(task) => Ok(task),
            None => Err(self.missed_update(id, expected).await),
        }
    }

    async fn update_status(&self, id: i64, data: UpdateTaskStatus) -> RepositoryResult<Task> {
        let expected = data.expected_version;

        match Task::update_status(&self.pool, id, data)
            .await
            .map_err(map_sqlx_error)?
        {
            Some(task) => Ok(task),
            None => Err(self.missed_update(id, expected).await),
        }
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        if Task::delete(&self.pool, id).await.map_err(map_sqlx_error)? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(Missing::Task(id)))
        }
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn list(&self) -> RepositoryResult<Vec<User>> {
        User::list(&self.pool).await.map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        User::find_by_id(&self.pool, id).await.map_err(map_sqlx_error)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        User::find_by_email(&self.pool, email)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert(&self, data: CreateUser) -> RepositoryResult<User> {
        User::create(&self.pool, data).await.map_err(map_sqlx_error)
    }

    async fn update(&self, id: i64, data: UpdateUser) -> RepositoryResult<User> {
        User::update(&self.pool, id, data)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| RepositoryError::NotFound(Missing::User(id)))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        User::count(&self.pool).await.map_err(map_sqlx_error)
    }
}
