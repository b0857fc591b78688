/// User management endpoints (ADMIN only)
///
/// - `GET /api/users` - List accounts
/// - `POST /api/users` - Create an account
/// - `PUT /api/users/:id` - Change name, email or role
///
/// Responses never include password hashes.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use taskdesk_shared::{
    auth::middleware::AuthContext,
    models::user::PublicUser,
    services::{NewUser, UserChanges},
};

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(state.users.list_users(&auth).await?))
}

/// Create a user
///
/// # Endpoint
///
/// ```text
/// POST /api/users
/// Content-Type: application/json
///
/// { "name": "Nina", "email": "nina@example.com", "role": "USER", "password": "..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, bad email, unknown role, weak password
/// - `403 Forbidden`: caller is not an admin
/// - `409 Conflict`: email already taken
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Json(input) = payload?;
    Ok(Json(state.users.create_user(&auth, input).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Path(raw) = path?;
    let id = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))?;
    let Json(changes) = payload?;

    Ok(Json(state.users.update_user(&auth, id, changes).await?))
}
