/// Session authentication for Axum
///
/// Requests carry a session token either as `Authorization: Bearer <token>`
/// or in the session cookie. Once the token is validated, an [`AuthContext`]
/// is placed in the request extensions, and handlers take it as an
/// extractor argument.
///
/// # Example
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use taskdesk_shared::auth::middleware::AuthContext;
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("{} ({})", auth.name, auth.role)
/// }
///
/// let app: Router = Router::new().route("/whoami", get(whoami));
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::jwt::{validate_token, Claims, JwtError};
use crate::models::user::{PublicUser, Role};

/// Identity of the signed-in caller
///
/// Built from validated token claims; never from request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// The caller as a client-facing user record
    pub fn to_public_user(&self) -> PublicUser {
        PublicUser {
            id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token in header or cookie
    MissingCredentials,

    /// Authorization header present but not a Bearer token
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl AuthError {
    fn message(&self) -> &str {
        match self {
            AuthError::MissingCredentials => "Authentication required",
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message(),
            "code": "UNAUTHENTICATED",
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Session expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid session token".to_string()),
        }
    }
}

/// Extracts a Bearer token from the `Authorization` header
///
/// Returns `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Malformed Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates a session token and builds the caller's context
pub fn authenticate_token(token: Option<&str>, secret: &str) -> Result<AuthContext, AuthError> {
    let token = token.ok_or(AuthError::MissingCredentials)?;
    let claims = validate_token(token, secret)?;

    Ok(AuthContext::from_claims(claims))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "middleware-test-secret-32-bytes-long!";

    fn token_for(role: Role, ttl: Duration) -> String {
        let claims = Claims::new(9, "Linus", "linus@example.com", role, ttl);
        create_token(&claims, SECRET).unwrap()
    }

    #[test]
    fn test_auth_context_from_claims() {
        let claims = Claims::new(3, "Ada", "ada@example.com", Role::Admin, Duration::hours(1));
        let context = AuthContext::from_claims(claims);

        assert_eq!(context.user_id, 3);
        assert!(context.is_admin());
        assert_eq!(context.to_public_user().email, "ada@example.com");
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Ok(None));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Ok(Some("abc.def.ghi")));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn test_authenticate_token() {
        let token = token_for(Role::User, Duration::hours(1));
        let context = authenticate_token(Some(&token), SECRET).unwrap();
        assert_eq!(context.user_id, 9);
        assert_eq!(context.role, Role::User);

        assert_eq!(
            authenticate_token(None, SECRET),
            Err(AuthError::MissingCredentials)
        );

        let expired = token_for(Role::User, Duration::seconds(-60));
        assert_eq!(
            authenticate_token(Some(&expired), SECRET),
            Err(AuthError::InvalidToken("Session expired".to_string()))
        );

        assert!(authenticate_token(Some(&token), "a-different-secret-of-32-bytes-long").is_err());
    }

    #[test]
    fn test_auth_error_into_response() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat("bad".to_string()),
            AuthError::InvalidToken("bad".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
