/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: HS256 access/refresh token issuance and verification
/// - [`clock`]: time source injected into the token issuer
/// - [`oauth`]: OAuth profile resolution and account linking
/// - [`service`]: the orchestrator for register, login, refresh and OAuth callback
/// - [`middleware`]: Axum JWT middleware producing an [`middleware::AuthContext`]
/// - [`authorization`]: authentication and role guards
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use siteline_shared::auth::clock::SystemClock;
/// use siteline_shared::auth::jwt::{TokenConfig, TokenIssuer, TokenSubject};
/// use siteline_shared::auth::password::{Argon2Hasher, HashParams, PasswordHasher};
/// use siteline_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::new(HashParams::default())?;
/// let digest = hasher.hash("Passw0rd1")?;
/// assert!(hasher.verify("Passw0rd1", &digest)?);
///
/// let issuer = TokenIssuer::new(
///     TokenConfig::new("a-secret-that-is-at-least-32-bytes!"),
///     Arc::new(SystemClock),
/// );
/// let subject = TokenSubject {
///     user_id: Uuid::new_v4(),
///     email: "alice@x.com".to_string(),
///     role: UserRole::Viewer,
/// };
/// let pair = issuer.issue_pair(&subject)?;
/// assert_eq!(issuer.verify_access(&pair.access_token)?.sub, subject.user_id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod clock;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod service;
