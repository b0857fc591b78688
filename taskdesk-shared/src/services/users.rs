/// User management
///
/// Accounts are created and edited by administrators only; there is no
/// self-service registration. Everything returned from here is a
/// [`PublicUser`], so password hashes never leave this module.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

use crate::auth::authorization::require_admin;
use crate::auth::middleware::AuthContext;
use crate::auth::password;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, CreateUser, PublicUser, Role, UpdateUser};
use crate::repository::UserRepository;

/// Body of a create-user request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// `ADMIN` or `USER`, exact spelling
    pub role: Option<String>,

    pub password: Option<String>,
}

/// Body of an update-user request; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<String>,
}

fn first_validation_message(errors: ValidationErrors) -> ServiceError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Validation failed".to_string());

    ServiceError::Validation(message)
}

fn parse_role(value: &str) -> ServiceResult<Role> {
    value
        .trim()
        .parse::<Role>()
        .map_err(|e| ServiceError::Validation(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Hashes on the blocking pool; Argon2 is deliberately slow
async fn hash_in_background(plaintext: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
        .await
        .map_err(|e| ServiceError::Persistence(format!("Hashing task failed: {e}")))?
        .map_err(ServiceError::from)
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn list_users(&self, auth: &AuthContext) -> ServiceResult<Vec<PublicUser>> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, "Rejected user listing by non-admin");
            return Err(e.into());
        }

        let users = self.users.list().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Creates an account with a hashed password
    pub async fn create_user(&self, auth: &AuthContext, input: NewUser) -> ServiceResult<PublicUser> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, "Rejected user creation by non-admin");
            return Err(e.into());
        }

        let (Some(name), Some(email), Some(role), Some(plaintext)) = (
            non_blank(input.name),
            non_blank(input.email).map(|e| normalize_email(&e)),
            non_blank(input.role),
            input.password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(ServiceError::missing_fields());
        };

        let role = parse_role(&role)?;
        let user = self.register(name, email, role, plaintext).await?;

        info!(user_id = user.id, role = %user.role, created_by = auth.user_id, "User created");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        auth: &AuthContext,
        id: i64,
        changes: UserChanges,
    ) -> ServiceResult<PublicUser> {
        if let Err(e) = require_admin(auth) {
            warn!(user_id = auth.user_id, target = id, "Rejected user update by non-admin");
            return Err(e.into());
        }

        let changes = UserChanges {
            name: changes.name.map(|s| s.trim().to_string()),
            email: changes.email.as_deref().map(normalize_email),
            role: changes.role,
        };
        changes.validate().map_err(first_validation_message)?;

        let update = UpdateUser {
            name: changes.name,
            email: changes.email,
            role: changes.role.as_deref().map(parse_role).transpose()?,
        };
        if update.is_empty() {
            return Err(ServiceError::Validation("No fields to update".to_string()));
        }

        let user = self.users.update(id, update).await?;

        info!(user_id = user.id, updated_by = auth.user_id, "User updated");
        Ok(user.into())
    }

    /// Creates the bootstrap administrator unless that email already exists
    ///
    /// Returns `None` when nothing had to be created.
    pub async fn ensure_seed_admin(
        &self,
        name: &str,
        email: &str,
        plaintext: &str,
    ) -> ServiceResult<Option<PublicUser>> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            info!(email = %email, "Seed admin already present");
            return Ok(None);
        }

        let user = self
            .register(
                name.trim().to_string(),
                email,
                Role::Admin,
                plaintext.to_string(),
            )
            .await?;

        info!(user_id = user.id, "Seed admin created");
        Ok(Some(user))
    }

    async fn register(
        &self,
        name: String,
        email: String,
        role: Role,
        plaintext: String,
    ) -> ServiceResult<PublicUser> {
        NewUser {
            name: Some(name.clone()),
            email: Some(email.clone()),
            ..Default::default()
        }
        .validate()
        .map_err(first_validation_message)?;

        password::validate_password_strength(&plaintext).map_err(ServiceError::Validation)?;
        let password_hash = hash_in_background(plaintext).await?;

        let user = self
            .users
            .insert(CreateUser {
                name,
                email,
                password_hash,
                role,
            })
            .await?;

        Ok(user.into())
    }
}
