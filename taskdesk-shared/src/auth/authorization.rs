/// Authorization checks
///
/// Two roles, two kinds of rule:
///
/// 1. **Role rules**: only ADMIN manages users and creates, edits or deletes
///    tasks.
/// 2. **Assignment rules**: a USER sees only the tasks assigned to them and
///    may move only those between statuses.
///
/// Visibility is expressed as a [`TaskScope`] that the repository applies,
/// so a USER's list is filtered at the source rather than in a handler.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::authorization::{require_admin, visibility_scope};
/// use taskdesk_shared::auth::middleware::AuthContext;
/// use taskdesk_shared::models::task::TaskScope;
/// use taskdesk_shared::models::user::Role;
///
/// let auth = AuthContext {
///     user_id: 4,
///     name: "Sam".to_string(),
///     email: "sam@example.com".to_string(),
///     role: Role::User,
/// };
///
/// assert!(require_admin(&auth).is_err());
/// assert_eq!(visibility_scope(&auth), TaskScope::AssignedTo(4));
/// ```

use super::middleware::AuthContext;
use crate::models::task::{Task, TaskScope};
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller doesn't have the required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// Caller is neither an admin nor the task's assignee
    #[error("Not authorized to change task {0}")]
    NotAssignee(i64),
}

/// Requires the ADMIN role
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        return Err(AuthzError::InsufficientRole {
            required: Role::Admin,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Which tasks the caller may see
pub fn visibility_scope(auth: &AuthContext) -> TaskScope {
    if auth.is_admin() {
        TaskScope::All
    } else {
        TaskScope::AssignedTo(auth.user_id)
    }
}

/// Whether the caller may see this particular task
pub fn can_view_task(auth: &AuthContext, task: &Task) -> bool {
    visibility_scope(auth).includes(task)
}

/// Requires that the caller may change this task's status
///
/// Admins may change any task; users only their own assignments.
pub fn require_status_change(auth: &AuthContext, task: &Task) -> Result<(), AuthzError> {
    if auth.is_admin() || task.assigned_to == auth.user_id {
        return Ok(());
    }

    Err(AuthzError::NotAssignee(task.id))
}
