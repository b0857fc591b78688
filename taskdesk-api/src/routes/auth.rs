/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/login` - Check credentials, set the session cookie
/// - `POST /api/auth/logout` - Clear the session cookie
/// - `GET /api/auth/session` - Who am I

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::session::SESSION_COOKIE,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::{json, Value};
use taskdesk_shared::{
    auth::middleware::AuthContext,
    models::user::PublicUser,
    services::Credentials,
};

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session token, also set as the session cookie
    pub token: String,

    pub user: PublicUser,

    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Sign in
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "admin@example.com", "password": "..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: email or password missing
/// - `401 Unauthorized`: `"Invalid credentials"`, whatever the cause
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let Json(credentials) = payload?;
    let session = state.sessions.login(credentials).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.session.cookie_secure);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: session.token,
            user: session.user,
            expires_in: session.expires_in.num_seconds(),
        }),
    ))
}

/// Sign out; always succeeds
///
/// Tokens are stateless, so this only tells the browser to drop the cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();

    (jar.add(cookie), Json(json!({ "message": "Logged out" })))
}

/// The caller's identity as carried by the session
pub async fn session(auth: AuthContext) -> Json<PublicUser> {
    Json(auth.to_public_user())
}
