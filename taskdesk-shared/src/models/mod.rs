/// Domain models for TaskDesk
///
/// This module contains the persisted entities and their database operations.
///
/// # Models
///
/// - `user`: User accounts, the canonical `Role` enum, and `PublicUser`
/// - `task`: Tasks, the `TaskStatus` label set, visibility scope and filters
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::task::{Task, TaskScope};
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let mine = Task::list(&pool, TaskScope::AssignedTo(2)).await?;
/// println!("{} tasks assigned to user 2", mine.len());
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
