/// Domain services
///
/// Each service holds `Arc<dyn ...>` repository handles injected at startup
/// and applies the authorization and validation rules before delegating to
/// storage.
///
/// - [`tasks::TaskService`]: task listing, creation, edits, status changes
/// - [`users::UserService`]: account administration and the seed admin
/// - [`sessions::SessionService`]: credential checks and token issuance

pub mod sessions;
pub mod tasks;
pub mod users;

pub use sessions::{Credentials, Session, SessionService};
pub use tasks::{StatusChange, TaskChanges, TaskDraft, TaskService};
pub use users::{NewUser, UserChanges, UserService};
