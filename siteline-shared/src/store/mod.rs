/// Credential store
///
/// Persistence boundary for [`User`] records. The auth orchestrator only
/// talks to the [`UserStore`] trait; two implementations are provided:
///
/// - [`memory::InMemoryUserStore`]: process-local, used for development and tests
/// - [`postgres::PgUserStore`]: PostgreSQL via sqlx
///
/// # Uniqueness
///
/// Stores must reject a save that would duplicate an email or a provider id
/// with [`StoreError::UniqueViolation`]. The orchestrator's own existence
/// checks are read-then-write and rely on this for correctness under
/// concurrent registrations and OAuth callbacks.

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::auth::oauth::OAuthProvider;
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// Column protected by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Id,
    Email,
    GoogleId,
    MicrosoftId,
}

impl UniqueField {
    /// Unique field holding a provider's account id
    pub fn for_provider(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => UniqueField::GoogleId,
            OAuthProvider::Microsoft => UniqueField::MicrosoftId,
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniqueField::Id => "id",
            UniqueField::Email => "email",
            UniqueField::GoogleId => "google_id",
            UniqueField::MicrosoftId => "microsoft_id",
        })
    }
}

/// Error type for credential store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record to update no longer exists
    #[error("User not found: {0}")]
    NotFound(Uuid),

    /// Save would duplicate a unique column
    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: UniqueField },

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence interface for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by exact email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user by a provider's account id
    async fn find_by_provider_id(
        &self,
        provider: OAuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>>;

    /// Finds a user by ID
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Inserts the user, or updates it if a record with the same ID exists
    ///
    /// Returns the stored record; `updated_at` is refreshed on update.
    async fn save(&self, user: User) -> StoreResult<User>;

    /// Toggles the active flag (administrative action)
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no user has this ID
    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<User>;
}
