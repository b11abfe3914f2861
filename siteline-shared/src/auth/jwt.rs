/// JWT token issuance and verification
///
/// This module provides the [`TokenIssuer`], which mints and verifies the
/// stateless access and refresh tokens handed out by every authentication
/// flow. Tokens are signed using HS256 (HMAC-SHA256) and carry the subject's
/// id, email and role.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable per token type (default 1 hour access, 7 days refresh)
/// - **Validation**: Signature, issuer, not-before and expiration checks
/// - **Revocation**: None. Expiry is the only termination mechanism.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use siteline_shared::auth::clock::SystemClock;
/// use siteline_shared::auth::jwt::{TokenConfig, TokenIssuer, TokenSubject, TokenType};
/// use siteline_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = TokenIssuer::new(
///     TokenConfig::new("your-secret-key-at-least-32-bytes-long"),
///     Arc::new(SystemClock),
/// );
///
/// let subject = TokenSubject {
///     user_id: Uuid::new_v4(),
///     email: "alice@x.com".to_string(),
///     role: UserRole::Viewer,
/// };
///
/// let token = issuer.issue_access_token(&subject)?;
/// let claims = issuer.verify(&token)?;
/// assert_eq!(claims.sub, subject.user_id);
/// assert_eq!(claims.token_type, TokenType::Access);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;
use crate::models::user::{User, UserRole};

/// Issuer claim stamped on and required of every token
pub const ISSUER: &str = "siteline";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format, issuer or not-before check failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the wrong kind
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "siteline")
/// - `iat`: Issued at timestamp
/// - `nbf`: Not before timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `email`: Subject's email at issuance
/// - `role`: Subject's role at issuance
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    pub email: String,

    pub role: UserRole,

    /// Issuer - Always "siteline"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    pub token_type: TokenType,
}

/// Identity a token is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl From<&Claims> for TokenSubject {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// Access + refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret (should be at least 32 bytes)
    pub secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Creates a config with the default lifetimes (1 hour access, 7 days refresh)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Gets the configured lifetime for a token type
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Mints and verifies signed, time-bounded tokens
///
/// Stateless: verification needs only the shared secret and the clock, so a
/// single issuer can be cloned freely across request handlers.
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
            clock,
        }
    }

    /// Gets the access token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    /// Builds claims for `subject` expiring after the type's configured lifetime
    ///
    /// # Errors
    ///
    /// Returns `TokenError::CreateError` if the expiry is not representable
    pub fn claims_for(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
    ) -> Result<Claims, TokenError> {
        let now = self.clock.now();
        let expiration = now
            .checked_add_signed(self.config.ttl(token_type))
            .ok_or_else(|| {
                TokenError::CreateError(format!("{} token lifetime out of range", token_type))
            })?;

        Ok(Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            role: subject.role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiration.timestamp(),
            token_type,
        })
    }

    /// Signs claims into a compact JWT
    ///
    /// # Errors
    ///
    /// Returns `TokenError::CreateError` if encoding fails
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
    }

    /// Issues a short-lived access token
    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.sign(&self.claims_for(subject, TokenType::Access)?)
    }

    /// Issues a long-lived refresh token
    pub fn issue_refresh_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.sign(&self.claims_for(subject, TokenType::Refresh)?)
    }

    /// Issues an access + refresh pair bound to the same subject
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(subject)?,
            refresh_token: self.issue_refresh_token(subject)?,
        })
    }

    /// Verifies a token and extracts its claims
    ///
    /// Verifies:
    /// - Signature is valid for the configured secret
    /// - Issuer is "siteline"
    /// - Not-before has been reached
    /// - Expiry has not been reached, according to the injected clock
    ///
    /// # Errors
    ///
    /// - `TokenError::Expired` once the clock reaches `exp`
    /// - `TokenError::Invalid` for every other failure
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        // Time checks run against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::Invalid("Token not yet valid".to_string()));
        }

        Ok(claims)
    }

    /// Verifies a token and checks it's an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Access)
    }

    /// Verifies a token and checks it's a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Refresh)
    }

    fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}
