/// Session tokens
///
/// A session is an HS256-signed JWT carrying the signed-in user's identity
/// and role. The server trusts these claims for the token's lifetime; a role
/// change takes effect at the next login.
///
/// # Claims
///
/// - `sub`: user ID
/// - `name`, `email`, `role`: the user's identity at login time
/// - `iss`: always `"taskdesk"`
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskdesk_shared::models::user::Role;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-of-at-least-32-bytes!!";
/// let claims = Claims::new(1, "Ada", "ada@example.com", Role::Admin, Duration::hours(24));
///
/// let token = create_token(&claims, secret)?;
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, 1);
/// assert_eq!(validated.role, Role::Admin);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::{Role, User};

/// Issuer stamped into and required from every token
pub const ISSUER: &str = "taskdesk";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// JWT claims for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: i64,

    /// Display name at login time
    pub name: String,

    /// Email at login time
    pub email: String,

    /// Role at login time
    pub role: Role,

    /// Issuer - always "taskdesk"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims valid from now for `ttl`
    pub fn new(
        user_id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            name: name.into(),
            email: email.into(),
            role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Creates claims for a stored user
    pub fn for_user(user: &User, ttl: Duration) -> Self {
        Self::new(user.id, user.name.as_str(), user.email.as_str(), user.role, ttl)
    }
}

/// Signs claims into a token string
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a token and returns its claims
///
/// Checks the signature, `exp`, `nbf` and issuer.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn sample_claims(ttl: Duration) -> Claims {
        Claims::new(42, "Grace", "grace@example.com", Role::User, ttl)
    }

    #[test]
    fn test_claims_creation() {
        let claims = sample_claims(Duration::hours(24));

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "taskdesk");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = sample_claims(Duration::hours(1));
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&sample_claims(Duration::hours(1)), SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes");
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = sample_claims(Duration::seconds(-3600));

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_foreign_issuer() {
        let mut claims = sample_claims(Duration::hours(1));
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("not.a.jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_role_round_trips_as_canonical_string() {
        let claims = Claims::new(1, "Root", "root@example.com", Role::Admin, Duration::hours(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "ADMIN");
    }
}
