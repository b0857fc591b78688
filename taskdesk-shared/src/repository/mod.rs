/// Storage abstraction for tasks and users
///
/// Services talk to storage only through [`TaskRepository`] and
/// [`UserRepository`]. Two implementations exist:
///
/// - [`postgres::PgRepository`]: the production store, backed by a pool
/// - [`memory::MemoryRepository`]: process-local maps, used by tests and
///   for running without a database
///
/// Both honour the same contract: IDs are assigned by the store and never
/// reused, `update`/`update_status` bump `version` and keep `updated_at`
/// strictly increasing, and a stale `expected_version` fails with
/// [`RepositoryError::VersionConflict`] without writing anything.

use async_trait::async_trait;

use crate::models::task::{CreateTask, Task, TaskScope, UpdateTask, UpdateTaskStatus};
use crate::models::user::{CreateUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// The entity a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Task addressed by ID
    Task(i64),

    /// User addressed by ID
    User(i64),

    /// The user a task body points at through `assignedTo`
    AssignedUser,
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Task(id) => write!(f, "Task {id}"),
            Missing::User(id) => write!(f, "User {id}"),
            Missing::AssignedUser => f.write_str("Assigned user"),
        }
    }
}

/// Errors that can occur during repository operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// Entity was not found
    #[error("{0} not found")]
    NotFound(Missing),

    /// Unique constraint violated on the named field
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    /// Conditional write against a stale version
    #[error("Version conflict on task {id}: expected {expected}, found {found}")]
    VersionConflict { id: i64, expected: i64, found: i64 },

    /// Anything else the store reported
    #[error("Database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Task persistence
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks visible within `scope`, ordered by ID
    async fn list(&self, scope: TaskScope) -> RepositoryResult<Vec<Task>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Task>>;

    /// Stores a new task with a fresh ID and `version = 1`
    async fn insert(&self, data: CreateTask) -> RepositoryResult<Task>;

    /// Overwrites the editable fields of an existing task
    async fn update(&self, id: i64, data: UpdateTask) -> RepositoryResult<Task>;

    /// Changes only the status of an existing task
    async fn update_status(&self, id: i64, data: UpdateTaskStatus) -> RepositoryResult<Task>;

    /// Removes a task; `NotFound` if it was not there
    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every user, ordered by ID
    async fn list(&self) -> RepositoryResult<Vec<User>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    /// Exact, case-sensitive email lookup
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Stores a new user; `Duplicate("email")` if the email is taken
    async fn insert(&self, data: CreateUser) -> RepositoryResult<User>;

    async fn update(&self, id: i64, data: UpdateUser) -> RepositoryResult<User>;

    async fn count(&self) -> RepositoryResult<i64>;
}
