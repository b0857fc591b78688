/// In-memory repositories
///
/// Tasks and users live in ordered maps behind a single `tokio` read-write
/// lock. Every mutation happens under the write lock, so reads never see a
/// half-applied change and version checks cannot race. Suitable for tests
/// and for running the server without PostgreSQL; nothing is persisted.
///
/// # Example
///
/// ```
/// use taskdesk_shared::models::user::{CreateUser, Role};
/// use taskdesk_shared::repository::{MemoryRepository, UserRepository};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = MemoryRepository::new();
/// let user = repo.insert(CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Admin,
/// }).await?;
///
/// assert_eq!(user.id, 1);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Missing, RepositoryError, RepositoryResult, TaskRepository, UserRepository};
use crate::models::task::{
    next_updated_at, CreateTask, Task, TaskScope, UpdateTask, UpdateTaskStatus,
};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User};

/// Emails match regardless of case, as under the `LOWER(email)` index
fn same_email(stored: &str, candidate: &str) -> bool {
    normalize_email(stored) == normalize_email(candidate)
}

#[derive(Debug, Default)]
struct Store {
    tasks: BTreeMap<i64, Task>,
    users: BTreeMap<i64, User>,
    last_task_id: i64,
    last_user_id: i64,
}

impl Store {
    fn ensure_user_exists(&self, id: i64) -> RepositoryResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(Missing::AssignedUser))
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|user| same_email(&user.email, email) && Some(user.id) != except)
    }

    /// Looks up a task for a conditional write
    fn task_for_write(&mut self, id: i64, expected: Option<i64>) -> RepositoryResult<&mut Task> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(Missing::Task(id)))?;

        if let Some(expected) = expected {
            if task.version != expected {
                return Err(RepositoryError::VersionConflict {
                    id,
                    expected,
                    found: task.version,
                });
            }
        }

        Ok(task)
    }
}

/// Process-local implementation of both repository traits
///
/// Clones share the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn list(&self, scope: TaskScope) -> RepositoryResult<Vec<Task>> {
        let store = self.store.read().await;

        Ok(store
            .tasks
            .values()
            .filter(|task| scope.includes(task))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        Ok(self.store.read().await.tasks.get(&id).cloned())
    }

    async fn insert(&self, data: CreateTask) -> RepositoryResult<Task> {
        let mut store = self.store.write().await;
        store.ensure_user_exists(data.assigned_to)?;

        store.last_task_id += 1;
        let task = Task {
            id: store.last_task_id,
            title: data.title,
            description: data.description,
            status: data.status,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            due_date: data.due_date,
            version: 1,
            created_at: data.created_at,
            updated_at: data.created_at,
        };

        store.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update(&self, id: i64, data: UpdateTask) -> RepositoryResult<Task> {
        let mut store = self.store.write().await;

        // Existence and version first, so a stale write reports the conflict
        // rather than a problem with its payload
        store.task_for_write(id, data.expected_version)?;
        store.ensure_user_exists(data.assigned_to)?;

        let task = store.task_for_write(id, data.expected_version)?;
        task.title = data.title;
        task.description = data.description;
        task.status = data.status;
        task.assigned_to = data.assigned_to;
        task.due_date = data.due_date;
        task.updated_at = next_updated_at(task.updated_at, data.updated_at);
        task.version += 1;

        Ok(task.clone())
    }

    async fn update_status(&self, id: i64, data: UpdateTaskStatus) -> RepositoryResult<Task> {
        let mut store = self.store.write().await;

        let task = store.task_for_write(id, data.expected_version)?;
        task.status = data.status;
        task.updated_at = next_updated_at(task.updated_at, data.updated_at);
        task.version += 1;

        Ok(task.clone())
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        self.store
            .write()
            .await
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(Missing::Task(id)))
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn list(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.store.read().await.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|user| same_email(&user.email, email)).cloned())
    }

    async fn insert(&self, data: CreateUser) -> RepositoryResult<User> {
        let mut store = self.store.write().await;

        if store.email_taken(&data.email, None) {
            return Err(RepositoryError::Duplicate("email".to_string()));
        }

        store.last_user_id += 1;
        let now = crate::models::task::now();
        let user = User {
            id: store.last_user_id,
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            created_at: now,
            updated_at: now,
        };

        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, data: UpdateUser) -> RepositoryResult<User> {
        let mut store = self.store.write().await;

        if let Some(email) = data.email.as_deref() {
            if store.email_taken(email, Some(id)) {
                return Err(RepositoryError::Duplicate("email".to_string()));
            }
        }

        let user = store
            .users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(Missing::User(id)))?;

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        user.updated_at = next_updated_at(user.updated_at, crate::models::task::now());

        Ok(user.clone())
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.store.read().await.users.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{now, TaskStatus};
    use crate::models::user::Role;
    use chrono::NaiveDate;

    async fn seeded() -> (MemoryRepository, User) {
        let repo = MemoryRepository::new();
        let user = UserRepository::insert(
            &repo,
            CreateUser {
                name: "Worker".to_string(),
                email: "worker@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap();
        (repo, user)
    }

    fn new_task(assignee: i64) -> CreateTask {
        CreateTask {
            title: "Inventory".to_string(),
            description: "Count the stock".to_string(),
            status: TaskStatus::NewAssigned,
            assigned_to: assignee,
            created_by: assignee,
            due_date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let (repo, user) = seeded().await;

        let first = TaskRepository::insert(&repo, new_task(user.id)).await.unwrap();
        TaskRepository::delete(&repo, first.id).await.unwrap();
        let second = TaskRepository::insert(&repo, new_task(user.id)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_insert_requires_existing_assignee() {
        let (repo, _) = seeded().await;

        let err = TaskRepository::insert(&repo, new_task(999)).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound(Missing::AssignedUser));
        assert!(TaskRepository::list(&repo, TaskScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_without_writing() {
        let (repo, user) = seeded().await;
        let task = TaskRepository::insert(&repo, new_task(user.id)).await.unwrap();

        let change = |expected| UpdateTaskStatus {
            status: TaskStatus::Pending,
            updated_at: now(),
            expected_version: expected,
        };

        let updated = repo.update_status(task.id, change(Some(1))).await.unwrap();
        assert_eq!(updated.version, 2);

        let err = repo.update_status(task.id, change(Some(1))).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::VersionConflict {
                id: task.id,
                expected: 1,
                found: 2
            }
        );

        let stored = TaskRepository::find_by_id(&repo, task.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (repo, _) = seeded().await;

        let err = UserRepository::insert(
            &repo,
            CreateUser {
                name: "Other".to_string(),
                email: "worker@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, RepositoryError::Duplicate("email".to_string()));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_email_lookup_and_uniqueness_ignore_case() {
        let (repo, _) = seeded().await;

        let found = repo.find_by_email("Worker@Example.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(1));

        let err = UserRepository::insert(
            &repo,
            CreateUser {
                name: "Shadow".to_string(),
                email: "WORKER@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, RepositoryError::Duplicate("email".to_string()));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_task() {
        let (repo, _) = seeded().await;
        assert_eq!(
            TaskRepository::delete(&repo, 42).await,
            Err(RepositoryError::NotFound(Missing::Task(42)))
        );
    }
}
