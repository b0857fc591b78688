/// Sign-in
///
/// Verifies an email/password pair and issues a session token. Every
/// failure mode (unknown email, wrong password, unusable stored hash)
/// surfaces as the same [`ServiceError::Authentication`], so a caller cannot
/// tell which accounts exist.

use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::jwt::{create_token, Claims};
use crate::auth::password;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, PublicUser, User};
use crate::repository::UserRepository;

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
    pub expires_in: Duration,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    secret: Arc<str>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(users: Arc<dyn UserRepository>, secret: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            users,
            secret: secret.into(),
            ttl,
        }
    }

    /// Checks credentials and returns the matching user
    pub async fn authenticate(&self, credentials: Credentials) -> ServiceResult<User> {
        let email = credentials
            .email
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty());
        let plaintext = credentials.password.filter(|p| !p.is_empty());

        let (Some(email), Some(plaintext)) = (email, plaintext) else {
            return Err(ServiceError::missing_fields());
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Login failed: unknown account");
            return Err(ServiceError::Authentication);
        };

        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
            .await
            .map_err(|e| ServiceError::Persistence(format!("Verification task failed: {e}")))?;

        match verified {
            Ok(true) => Ok(user),
            Ok(false) => {
                warn!(user_id = user.id, "Login failed: wrong password");
                Err(ServiceError::Authentication)
            }
            Err(e) => {
                error!(user_id = user.id, error = %e, "Stored password hash is unusable");
                Err(ServiceError::Authentication)
            }
        }
    }

    /// Signs a session token for `user`
    pub fn issue(&self, user: &User) -> ServiceResult<Session> {
        let claims = Claims::for_user(user, self.ttl);
        let token = create_token(&claims, &self.secret)?;

        Ok(Session {
            token,
            user: PublicUser::from(user),
            expires_in: self.ttl,
        })
    }

    /// Authenticates and issues in one step
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<Session> {
        let user = self.authenticate(credentials).await?;
        let session = self.issue(&user)?;

        info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(session)
    }
}
