/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: session token signing and validation
/// - [`middleware`]: caller identity extraction for Axum
/// - [`authorization`]: role and assignment checks
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
/// use taskdesk_shared::auth::jwt::{create_token, Claims};
/// use taskdesk_shared::models::user::Role;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(1, "Ada", "ada@example.com", Role::Admin, Duration::hours(24));
/// let token = create_token(&claims, "a-secret-key-of-at-least-32-bytes!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
