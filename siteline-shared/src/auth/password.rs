/// Password hashing module using Argon2id
///
/// This module defines the [`PasswordHasher`] interface the auth orchestrator
/// depends on and its Argon2id implementation.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB) by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Salt**: 16 random bytes per call, embedded in the PHC string
///
/// # Example
///
/// ```
/// use siteline_shared::auth::password::{Argon2Hasher, HashParams, PasswordHasher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::new(HashParams::default())?;
///
/// let hash = hasher.hash("Passw0rd1")?;
/// assert!(hasher.verify("Passw0rd1", &hash)?);
/// assert!(!hasher.verify("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Argon2, Params, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Plaintext was empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// One-way password hashing and verification
///
/// Implementations must salt every call so hashing the same plaintext twice
/// yields different digests.
pub trait PasswordHasher: Send + Sync {
    /// Produces a salted one-way digest of `plaintext`
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Returns `Ok(true)` iff `plaintext` hashes to `digest` under its embedded salt
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, PasswordError>;
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Parallel lanes
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashParams {
    /// Minimum-cost parameters for tests and local tooling
    ///
    /// Never use these in production.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Argon2id [`PasswordHasher`]
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl Argon2Hasher {
    /// Creates a hasher with the given cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if argon2 rejects the parameters
    /// (for example memory below 8 KiB per lane).
    pub fn new(params: HashParams) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(params.memory_kib)
            .t_cost(params.iterations)
            .p_cost(params.parallelism)
            .output_len(32) // 32-byte hash output
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    /// Hashes a password into PHC string format
    ///
    /// Example output:
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::InvalidInput(
                "Password must not be empty".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a PHC digest (constant-time comparison)
    ///
    /// Cost parameters are read from the digest, so digests produced under
    /// older parameters still verify.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::InvalidInput(
                "Password must not be empty".to_string(),
            ));
        }
        if digest.is_empty() {
            return Err(PasswordError::InvalidInput(
                "Digest must not be empty".to_string(),
            ));
        }

        let parsed_hash = PasswordHash::new(digest)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}

/// Validates password strength for registration
///
/// Requirements:
/// - At least 8 characters long
/// - At least one uppercase letter
/// - At least one lowercase letter
/// - At least one digit
///
/// # Example
///
/// ```
/// use siteline_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Passw0rd1").is_ok());
/// assert!(validate_password_strength("Sh0rt").is_err());
/// assert!(validate_password_strength("password1").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }

    Ok(())
}
