/// API route handlers
///
/// Handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign in, sign out, current session
/// - `tasks`: Task listing, creation, edits, status changes, deletion
/// - `users`: User administration
/// - `pages`: HTML shells behind the page gate

pub mod auth;
pub mod health;
pub mod pages;
pub mod tasks;
pub mod users;
