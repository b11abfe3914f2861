/// Authentication orchestrator
///
/// [`AuthService`] is the single entry point for the register, login,
/// refresh and OAuth-callback flows. It is assembled by explicit constructor
/// injection of the credential store, password hasher, token issuer and
/// OAuth resolver.
///
/// # Error policy
///
/// Every flow converts store, hashing and token failures into [`AuthError`];
/// none of the component error types escape. `Unauthorized` messages are
/// deliberately coarse: an unknown email and a wrong password yield the exact
/// same error.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use siteline_shared::auth::clock::SystemClock;
/// use siteline_shared::auth::jwt::{TokenConfig, TokenIssuer};
/// use siteline_shared::auth::oauth::OAuthResolver;
/// use siteline_shared::auth::password::{Argon2Hasher, HashParams};
/// use siteline_shared::auth::service::{AuthPolicy, AuthService, RegisterInput};
/// use siteline_shared::store::InMemoryUserStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(InMemoryUserStore::new());
/// let service = AuthService::new(
///     store.clone(),
///     Arc::new(Argon2Hasher::new(HashParams::default())?),
///     TokenIssuer::new(TokenConfig::new("a-secret-that-is-at-least-32-bytes!"), Arc::new(SystemClock)),
///     OAuthResolver::new(store),
///     AuthPolicy::default(),
/// )?;
///
/// let registered = service
///     .register(RegisterInput {
///         email: "alice@x.com".to_string(),
///         first_name: "Alice".to_string(),
///         last_name: "Archer".to_string(),
///         password: "Passw0rd1".to_string(),
///     })
///     .await?;
///
/// let session = service.login("alice@x.com", "Passw0rd1").await?;
/// assert_eq!(session.user.id, registered.user.id);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use super::jwt::{Claims, TokenError, TokenIssuer, TokenSubject};
use super::oauth::{OAuthError, OAuthProfile, OAuthProvider, OAuthResolver};
use super::password::{validate_password_strength, PasswordError, PasswordHasher};
use crate::models::user::{NewUser, SanitizedUser, User, UserRole};
use crate::store::{StoreError, UniqueField, UserStore};

/// Returned for an unknown email and for a wrong password alike
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub const ACCOUNT_INACTIVE: &str = "Account is inactive";

pub const OAUTH_ONLY_ACCOUNT: &str = "Please use OAuth to login";

pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

pub const INVALID_ACCESS_TOKEN: &str = "Invalid or expired token";

/// Plaintext hashed once at startup to give missing-digest logins the same
/// verification cost as real ones.
const DECOY_PASSWORD: &str = "decoy-password-for-uniform-login-cost";

/// Error taxonomy of the authentication flows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email already registered or identity already claimed
    #[error("{0}")]
    Conflict(String),

    /// Credential, token, or inactive-account failure
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed caller input
    #[error("{0}")]
    InvalidInput(String),

    /// OAuth profile missing required fields
    #[error("{0}")]
    InvalidProfile(String),

    /// Subject of a valid token no longer exists
    #[error("{0}")]
    NotFound(String),

    /// Backend failure; the message is for logs only
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    fn unauthorized(message: &str) -> Self {
        AuthError::Unauthorized(message.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation {
                field: UniqueField::Email,
            } => AuthError::Conflict("Email already registered".to_string()),
            StoreError::UniqueViolation { field } => {
                AuthError::Conflict(format!("Account already exists for {}", field))
            }
            StoreError::NotFound(_) => AuthError::NotFound("User not found".to_string()),
            StoreError::Database(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::CreateError(msg) => AuthError::Internal(msg),
            _ => AuthError::unauthorized(INVALID_ACCESS_TOKEN),
        }
    }
}

impl From<OAuthError> for AuthError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::InvalidProfile(msg) => AuthError::InvalidProfile(msg),
            OAuthError::UnknownProvider(provider) => {
                AuthError::InvalidInput(format!("Unknown OAuth provider: {}", provider))
            }
            OAuthError::Conflict(field) => AuthError::Conflict(format!(
                "OAuth identity conflicts with an existing account on {}",
                field
            )),
            OAuthError::Store(err) => err.into(),
        }
    }
}

/// Auth result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Policy switches for behavior the product may tune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Reject OAuth callbacks that resolve to an inactive account
    pub require_active_for_oauth: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            require_active_for_oauth: true,
        }
    }
}

/// Registration input
#[derive(Clone)]
pub struct RegisterInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl RegisterInput {
    fn validate(&self) -> AuthResult<()> {
        if !self.email.validate_email() {
            return Err(AuthError::InvalidInput(
                "Please provide a valid email address".to_string(),
            ));
        }
        if self.first_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("First name is required".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("Last name is required".to_string()));
        }
        validate_password_strength(&self.password).map_err(AuthError::InvalidInput)
    }
}

/// Tokens plus the sanitized user, returned by every session-creating flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SanitizedUser,
}

/// Result of a refresh: a new access token only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Coordinates the credential store, hasher, token issuer and OAuth resolver
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: TokenIssuer,
    oauth: OAuthResolver,
    policy: AuthPolicy,
    decoy_digest: Arc<str>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Assembles the service from its collaborators
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the hasher cannot produce the decoy
    /// digest used to equalize login cost.
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenIssuer,
        oauth: OAuthResolver,
        policy: AuthPolicy,
    ) -> AuthResult<Self> {
        let decoy_digest = hasher
            .hash(DECOY_PASSWORD)
            .map_err(|e| AuthError::Internal(format!("Failed to prepare decoy digest: {}", e)))?;

        Ok(Self {
            store,
            hasher,
            tokens,
            oauth,
            policy,
            decoy_digest: decoy_digest.into(),
        })
    }

    /// Gets the token issuer (for request guards)
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Registers a password account with the default `viewer` role
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed email, blank names, or a weak password
    /// - `Conflict` if the email is already registered, including when a
    ///   concurrent registration wins the insert
    pub async fn register(&self, input: RegisterInput) -> AuthResult<AuthResponse> {
        input.validate()?;

        if self.store.find_by_email(&input.email).await?.is_some() {
            info!("Registration rejected: email already registered");
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hasher.hash(&input.password).map_err(|e| match e {
            PasswordError::InvalidInput(msg) => AuthError::InvalidInput(msg),
            other => AuthError::Internal(other.to_string()),
        })?;

        let user = self
            .store
            .save(User::new(NewUser {
                email: input.email,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                password_hash: Some(password_hash),
                role: UserRole::Viewer,
                ..Default::default()
            }))
            .await?;

        info!(user_id = %user.id, "User registered");
        self.session_for(user)
    }

    /// Authenticates with email and password
    ///
    /// # Errors
    ///
    /// `Unauthorized` with [`INVALID_CREDENTIALS`] for an unknown email or a
    /// wrong password, [`ACCOUNT_INACTIVE`] for a deactivated account, and
    /// [`OAUTH_ONLY_ACCOUNT`] for an account without a password.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AuthResponse> {
        let Some(user) = self.store.find_by_email(email).await? else {
            self.burn_decoy_verification(password);
            debug!("Login failed: unknown email");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        };

        if !user.is_active {
            warn!(user_id = %user.id, "Login rejected: account inactive");
            return Err(AuthError::unauthorized(ACCOUNT_INACTIVE));
        }

        let Some(digest) = user.password_hash.as_deref() else {
            self.burn_decoy_verification(password);
            debug!(user_id = %user.id, "Login rejected: OAuth-only account");
            return Err(AuthError::unauthorized(OAUTH_ONLY_ACCOUNT));
        };

        match self.hasher.verify(password, digest) {
            Ok(true) => {}
            Ok(false) | Err(PasswordError::InvalidInput(_)) => {
                debug!(user_id = %user.id, "Login failed: password mismatch");
                return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Stored password digest is unusable");
                return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
            }
        }

        info!(user_id = %user.id, "Login successful");
        self.session_for(user)
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The refresh token itself is not rotated and stays valid until its own
    /// expiry.
    ///
    /// # Errors
    ///
    /// `Unauthorized` with [`INVALID_REFRESH_TOKEN`] for any verification
    /// failure, or when the subject is missing or inactive.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshResponse> {
        let claims = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            AuthError::unauthorized(INVALID_REFRESH_TOKEN)
        })?;

        let user = match self.store.find_by_id(claims.sub).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!(user_id = %claims.sub, "Refresh rejected: user missing or inactive");
                return Err(AuthError::unauthorized(INVALID_REFRESH_TOKEN));
            }
        };

        let access_token = self.tokens.issue_access_token(&TokenSubject::from(&user))?;

        info!(user_id = %user.id, "Access token refreshed");
        Ok(RefreshResponse { access_token })
    }

    /// Completes an OAuth login with an already-exchanged provider profile
    ///
    /// # Errors
    ///
    /// - `InvalidProfile` if the profile lacks an id or email
    /// - `Unauthorized` with [`ACCOUNT_INACTIVE`] if the resolved account is
    ///   deactivated and [`AuthPolicy::require_active_for_oauth`] is set
    pub async fn oauth_callback(
        &self,
        provider: OAuthProvider,
        profile: &OAuthProfile,
    ) -> AuthResult<AuthResponse> {
        let user = self.oauth.resolve(profile, provider).await?;

        if self.policy.require_active_for_oauth && !user.is_active {
            warn!(user_id = %user.id, %provider, "OAuth login rejected: account inactive");
            return Err(AuthError::unauthorized(ACCOUNT_INACTIVE));
        }

        info!(user_id = %user.id, %provider, "OAuth login successful");
        self.session_for(user)
    }

    /// Verifies an access token and loads its active subject
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for an invalid, expired or non-access token, or an inactive subject
    /// - `NotFound` if the subject was deleted after the token was issued
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<SanitizedUser> {
        let claims = self.verify_access(access_token)?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if !user.is_active {
            return Err(AuthError::unauthorized(ACCOUNT_INACTIVE));
        }

        Ok(user.into())
    }

    /// Verifies an access token without touching the store
    pub fn verify_access(&self, access_token: &str) -> AuthResult<Claims> {
        self.tokens.verify_access(access_token).map_err(|e| {
            debug!(error = %e, "Access token rejected");
            AuthError::unauthorized(INVALID_ACCESS_TOKEN)
        })
    }

    /// Activates or deactivates an account
    pub async fn set_user_active(&self, user_id: Uuid, is_active: bool) -> AuthResult<SanitizedUser> {
        let user = self.store.set_active(user_id, is_active).await?;

        info!(%user_id, is_active, "User active flag changed");
        Ok(user.into())
    }

    fn session_for(&self, user: User) -> AuthResult<AuthResponse> {
        let pair = self.tokens.issue_pair(&TokenSubject::from(&user))?;

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: user.into(),
        })
    }

    fn burn_decoy_verification(&self, password: &str) {
        let _ = self.hasher.verify(password, &self.decoy_digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::jwt::{TokenConfig, TokenType};
    use crate::auth::password::{Argon2Hasher, HashParams};
    use crate::store::InMemoryUserStore;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    struct Harness {
        service: AuthService,
        store: Arc<InMemoryUserStore>,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        harness_with_policy(AuthPolicy::default())
    }

    fn harness_with_policy(policy: AuthPolicy) -> Harness {
        let store = Arc::new(InMemoryUserStore::new());
        let clock = ManualClock::default();
        let service = AuthService::new(
            store.clone(),
            Arc::new(Argon2Hasher::new(HashParams::insecure_fast()).unwrap()),
            TokenIssuer::new(TokenConfig::new(SECRET), Arc::new(clock.clone())),
            OAuthResolver::new(store.clone()),
            policy,
        )
        .unwrap();

        Harness {
            service,
            store,
            clock,
        }
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            email: "alice@x.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Archer".to_string(),
            password: "Passw0rd1".to_string(),
        }
    }

    fn google_profile(id: &str, email: &str) -> OAuthProfile {
        OAuthProfile {
            id: id.to_string(),
            email: email.to_string(),
            given_name: Some("Grace".to_string()),
            family_name: None,
            picture_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = harness();

        let registered = h.service.register(alice()).await.unwrap();
        assert_eq!(registered.user.email, "alice@x.com");
        assert_eq!(registered.user.role, UserRole::Viewer);
        assert!(registered.user.is_active);

        let session = h.service.login("alice@x.com", "Passw0rd1").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
        assert_eq!(session.user.email, "alice@x.com");

        let json = serde_json::to_value(&session).unwrap();
        assert!(json["user"].get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[tokio::test]
    async fn test_register_stores_digest_not_plaintext() {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();

        let stored = h.store.find_by_id(registered.user.id).await.unwrap().unwrap();
        let digest = stored.password_hash.unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("Passw0rd1"));
    }

    #[tokio::test]
    async fn test_register_tokens_bound_to_user() {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();

        let access = h.service.tokens().verify_access(&registered.access_token).unwrap();
        let refresh = h.service.tokens().verify_refresh(&registered.refresh_token).unwrap();

        assert_eq!(access.sub, registered.user.id);
        assert_eq!(access.email, "alice@x.com");
        assert_eq!(access.role, UserRole::Viewer);
        assert_eq!(refresh.sub, registered.user.id);
        assert_eq!(refresh.token_type, TokenType::Refresh);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let h = harness();
        let first = h.service.register(alice()).await.unwrap();

        let mut again = alice();
        again.first_name = "Impostor".to_string();
        again.password = "Different1".to_string();
        let result = h.service.register(again).await;

        assert!(matches!(result, Err(AuthError::Conflict(_))));

        let stored = h.store.find_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.user.id);
        assert_eq!(stored.first_name, "Alice");
        assert!(h.service.login("alice@x.com", "Passw0rd1").await.is_ok());
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_single_winner() {
        let h = harness();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move { service.register(alice()).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(matches!(err, AuthError::Conflict(_))),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let h = harness();

        let mut bad_email = alice();
        bad_email.email = "not-an-email".to_string();
        let mut weak = alice();
        weak.password = "password".to_string();
        let mut blank_name = alice();
        blank_name.first_name = "  ".to_string();

        for input in [bad_email, weak, blank_name] {
            assert!(matches!(
                h.service.register(input).await,
                Err(AuthError::InvalidInput(_))
            ));
        }
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_indistinguishable() {
        let h = harness();
        h.service.register(alice()).await.unwrap();

        let wrong_password = h.service.login("alice@x.com", "Wrong0ne1").await.unwrap_err();
        let unknown_email = h.service.login("bob@x.com", "Passw0rd1").await.unwrap_err();

        assert_eq!(wrong_password, unknown_email);
        assert_eq!(
            wrong_password,
            AuthError::Unauthorized(INVALID_CREDENTIALS.to_string())
        );
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_empty_password_is_invalid_credentials() {
        let h = harness();
        h.service.register(alice()).await.unwrap();

        assert_eq!(
            h.service.login("alice@x.com", "").await.unwrap_err(),
            AuthError::Unauthorized(INVALID_CREDENTIALS.to_string())
        );
        assert_eq!(
            h.service.login("nobody@x.com", "").await.unwrap_err(),
            AuthError::Unauthorized(INVALID_CREDENTIALS.to_string())
        );
    }

    #[tokio::test]
    async fn test_login_inactive_account() {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();
        h.service.set_user_active(registered.user.id, false).await.unwrap();

        assert_eq!(
            h.service.login("alice@x.com", "Passw0rd1").await.unwrap_err(),
            AuthError::Unauthorized(ACCOUNT_INACTIVE.to_string())
        );
    }

    #[tokio::test]
    async fn test_login_oauth_only_account() {
        let h = harness();
        h.service
            .oauth_callback(OAuthProvider::Google, &google_profile("g-1", "grace@x.com"))
            .await
            .unwrap();

        assert_eq!(
            h.service.login("grace@x.com", "Passw0rd1").await.unwrap_err(),
            AuthError::Unauthorized(OAUTH_ONLY_ACCOUNT.to_string())
        );
    }

    #[tokio::test]
    async fn test_register_login_refresh_scenario() {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();
        let session = h.service.login("alice@x.com", "Passw0rd1").await.unwrap();

        h.clock.advance(Duration::minutes(30));
        let refreshed = h.service.refresh(&session.refresh_token).await.unwrap();

        let claims = h.service.tokens().verify_access(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.email, "alice@x.com");
    }

    #[tokio::test]
    async fn test_refresh_does_not_rotate_refresh_token() {
        let h = harness();
        let session = h.service.register(alice()).await.unwrap();

        h.service.refresh(&session.refresh_token).await.unwrap();
        h.clock.advance(Duration::hours(2));

        // Same refresh token still works after the original access token expired.
        assert!(h.service.verify_access(&session.access_token).is_err());
        assert!(h.service.refresh(&session.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_failures_collapse_to_one_error() {
        let h = harness();
        let session = h.service.register(alice()).await.unwrap();
        let expected = AuthError::Unauthorized(INVALID_REFRESH_TOKEN.to_string());

        // Garbage
        assert_eq!(h.service.refresh("garbage").await.unwrap_err(), expected);

        // Access token used as refresh token
        assert_eq!(
            h.service.refresh(&session.access_token).await.unwrap_err(),
            expected
        );

        // Expired
        h.clock.advance(Duration::days(7));
        assert_eq!(
            h.service.refresh(&session.refresh_token).await.unwrap_err(),
            expected
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_inactive_or_missing_user() {
        let h = harness();
        let session = h.service.register(alice()).await.unwrap();
        h.service.set_user_active(session.user.id, false).await.unwrap();

        assert_eq!(
            h.service.refresh(&session.refresh_token).await.unwrap_err(),
            AuthError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
        );

        let ghost = TokenSubject {
            user_id: Uuid::new_v4(),
            email: "ghost@x.com".to_string(),
            role: UserRole::Admin,
        };
        let ghost_token = h.service.tokens().issue_refresh_token(&ghost).unwrap();
        assert_eq!(
            h.service.refresh(&ghost_token).await.unwrap_err(),
            AuthError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_current_role() {
        let h = harness();
        let session = h.service.register(alice()).await.unwrap();

        let mut user = h.store.find_by_id(session.user.id).await.unwrap().unwrap();
        user.role = UserRole::Supervisor;
        h.store.save(user).await.unwrap();

        let refreshed = h.service.refresh(&session.refresh_token).await.unwrap();
        let claims = h.service.verify_access(&refreshed.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Supervisor);
    }

    #[tokio::test]
    async fn test_oauth_callback_idempotent() {
        let h = harness();
        let profile = google_profile("g-1", "grace@x.com");

        let first = h.service.oauth_callback(OAuthProvider::Google, &profile).await.unwrap();
        let second = h.service.oauth_callback(OAuthProvider::Google, &profile).await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.role, UserRole::Viewer);
        assert!(h.service.verify_access(&second.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_oauth_callback_links_existing_password_account() {
        let h = harness();
        let registered = h.service.register(alice()).await.unwrap();

        let linked = h
            .service
            .oauth_callback(OAuthProvider::Microsoft, &google_profile("ms-7", "alice@x.com"))
            .await
            .unwrap();

        assert_eq!(linked.user.id, registered.user.id);
        assert_eq!(linked.user.microsoft_id.as_deref(), Some("ms-7"));
        assert_eq!(h.store.len().await, 1);

        // Password login still works after linking.
        assert!(h.service.login("alice@x.com", "Passw0rd1").await.is_ok());
    }

    #[tokio::test]
    async fn test_oauth_callback_invalid_profile() {
        let h = harness();

        let result = h
            .service
            .oauth_callback(OAuthProvider::Google, &google_profile("g-1", ""))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidProfile(_))));
    }

    #[tokio::test]
    async fn test_oauth_callback_inactive_account_policy() {
        let strict = harness();
        let session = strict
            .service
            .oauth_callback(OAuthProvider::Google, &google_profile("g-1", "grace@x.com"))
            .await
            .unwrap();
        strict.service.set_user_active(session.user.id, false).await.unwrap();

        assert_eq!(
            strict
                .service
                .oauth_callback(OAuthProvider::Google, &google_profile("g-1", "grace@x.com"))
                .await
                .unwrap_err(),
            AuthError::Unauthorized(ACCOUNT_INACTIVE.to_string())
        );

        let lenient = harness_with_policy(AuthPolicy {
            require_active_for_oauth: false,
        });
        let session = lenient
            .service
            .oauth_callback(OAuthProvider::Google, &google_profile("g-1", "grace@x.com"))
            .await
            .unwrap();
        lenient.service.set_user_active(session.user.id, false).await.unwrap();

        let again = lenient
            .service
            .oauth_callback(OAuthProvider::Google, &google_profile("g-1", "grace@x.com"))
            .await
            .unwrap();
        assert!(!again.user.is_active);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let h = harness();
        let session = h.service.register(alice()).await.unwrap();

        let user = h.service.authenticate(&session.access_token).await.unwrap();
        assert_eq!(user.id, session.user.id);

        assert!(matches!(
            h.service.authenticate(&session.refresh_token).await,
            Err(AuthError::Unauthorized(_))
        ));

        let ghost = TokenSubject {
            user_id: Uuid::new_v4(),
            email: "ghost@x.com".to_string(),
            role: UserRole::Viewer,
        };
        let ghost_token = h.service.tokens().issue_access_token(&ghost).unwrap();
        assert!(matches!(
            h.service.authenticate(&ghost_token).await,
            Err(AuthError::NotFound(_))
        ));

        h.clock.advance(Duration::hours(1));
        assert!(matches!(
            h.service.authenticate(&session.access_token).await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_set_user_active_unknown_user() {
        let h = harness();
        assert!(matches!(
            h.service.set_user_active(Uuid::new_v4(), false).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            AuthError::from(StoreError::UniqueViolation {
                field: UniqueField::Email
            }),
            AuthError::Conflict(_)
        ));
        assert!(matches!(
            AuthError::from(StoreError::Database("boom".to_string())),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_register_input_debug_redacts_password() {
        let debug = format!("{:?}", alice());
        assert!(!debug.contains("Passw0rd1"));
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_emails() {
        let h = harness();

        for email in [
            "alice",
            "@x.com",
            "alice@",
            "a@b@c",
            "al ice@x.com",
            "x@.",
            "a@-",
            "a@b..c",
            "<script>@x",
        ] {
            let mut input = alice();
            input.email = email.to_string();
            assert_eq!(
                h.service.register(input).await.unwrap_err(),
                AuthError::InvalidInput("Please provide a valid email address".to_string()),
                "{} should be rejected",
                email
            );
        }
        assert!(h.store.is_empty().await);
    }
}
