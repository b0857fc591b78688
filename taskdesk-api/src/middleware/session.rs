/// Session gate
///
/// Two flavors of the same check:
///
/// - [`require_session`] guards `/api/*` and answers `401` JSON when the
///   caller has no valid session.
/// - [`require_page_session`] guards HTML pages and answers
///   `303 See Other` to `/login` instead.
///
/// Both accept the token from `Authorization: Bearer <token>` first and fall
/// back to the `taskdesk_session` cookie. On success the caller's
/// [`AuthContext`] is inserted into the request extensions.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use taskdesk_shared::auth::middleware::{authenticate_token, bearer_token, AuthContext, AuthError};
use tracing::debug;

use crate::app::AppState;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "taskdesk_session";

/// Where unauthenticated page requests are sent
pub const LOGIN_PATH: &str = "/login";

/// Token from the Authorization header, else from the session cookie
fn session_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    if let Some(token) = bearer_token(headers)? {
        return Ok(Some(token.to_string()));
    }

    let jar = CookieJar::from_headers(headers);
    Ok(jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty()))
}

/// Resolves the caller from request headers
pub fn authenticate_headers(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = session_token(headers)?;
    authenticate_token(token.as_deref(), secret)
}

/// API gate: 401 JSON on failure
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = authenticate_headers(req.headers(), state.jwt_secret()).map_err(|e| {
        debug!(path = %req.uri().path(), error = ?e, "Rejected unauthenticated API request");
        e
    })?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Page gate: redirect to the login page on failure
pub async fn require_page_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate_headers(req.headers(), state.jwt_secret()) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            debug!(path = %req.uri().path(), error = ?e, "Redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
