/// OAuth profile resolution
///
/// Maps an already-exchanged external provider profile onto a local
/// [`User`]. The provider redirect and code exchange happen before this
/// module is involved.
///
/// # Resolution order (first match wins)
///
/// 1. A user already linked to this provider id is returned unchanged.
/// 2. A user with the same email gets the provider id (and the avatar, if it
///    has none) attached, and is returned. No password proof is required:
///    the provider's email verification is trusted.
/// 3. Otherwise a new OAuth-only viewer account is created.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::user::{NewUser, User, UserRole};
use crate::store::{StoreError, UniqueField, UserStore};

/// Supported external identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Microsoft,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "microsoft" => Ok(OAuthProvider::Microsoft),
            other => Err(OAuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// Normalized external profile
///
/// Accepts both the normalized field names and the raw names of a Google
/// userinfo response (`sub`, `given_name`, `family_name`, `picture`) and a
/// Microsoft Graph `/me` response (`givenName`, `surname`, `mail`). A `null`
/// email reads as empty and fails resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProfile {
    /// Provider-specific account id
    #[serde(alias = "sub")]
    pub id: String,

    #[serde(default, alias = "mail", deserialize_with = "null_as_empty")]
    pub email: String,

    #[serde(default, alias = "given_name", alias = "firstName")]
    pub given_name: Option<String>,

    #[serde(default, alias = "family_name", alias = "lastName", alias = "surname")]
    pub family_name: Option<String>,

    #[serde(default, alias = "picture", alias = "photo")]
    pub picture_url: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl OAuthProfile {
    fn validate(&self) -> Result<(), OAuthError> {
        if self.id.trim().is_empty() {
            return Err(OAuthError::InvalidProfile(
                "Profile is missing the provider account id".to_string(),
            ));
        }
        if self.email.trim().is_empty() {
            return Err(OAuthError::InvalidProfile(
                "Profile is missing an email address".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type for OAuth resolution
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Caller passed a profile without id or email
    #[error("Invalid OAuth profile: {0}")]
    InvalidProfile(String),

    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),

    /// Identity collides with a different account
    #[error("OAuth identity conflicts with an existing account on {0}")]
    Conflict(UniqueField),

    #[error(transparent)]
    Store(StoreError),
}

/// Resolves external profiles to local users (find, link, or create)
#[derive(Clone)]
pub struct OAuthResolver {
    store: Arc<dyn UserStore>,
}

impl fmt::Debug for OAuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthResolver").finish_non_exhaustive()
    }
}

impl OAuthResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Resolves `profile` from `provider` to a persisted local user
    ///
    /// # Errors
    ///
    /// - `OAuthError::InvalidProfile` if the profile has no id or email
    /// - `OAuthError::Conflict` if a concurrent writer claimed the identity
    ///   for a different account
    /// - `OAuthError::Store` for backend failures
    pub async fn resolve(
        &self,
        profile: &OAuthProfile,
        provider: OAuthProvider,
    ) -> Result<User, OAuthError> {
        profile.validate()?;

        if let Some(user) = self.find_linked(profile, provider).await? {
            debug!(user_id = %user.id, %provider, "Found existing OAuth user");
            return Ok(user);
        }

        let result = match self
            .store
            .find_by_email(&profile.email)
            .await
            .map_err(OAuthError::Store)?
        {
            Some(existing) => self.link(existing, profile, provider).await,
            None => self.create(profile, provider).await,
        };

        match result {
            Err(StoreError::UniqueViolation { field }) => {
                // Lost a race with a concurrent callback for the same identity.
                warn!(%provider, %field, "Unique violation while resolving OAuth profile, retrying lookup");
                self.find_linked(profile, provider)
                    .await?
                    .ok_or(OAuthError::Conflict(field))
            }
            other => other.map_err(OAuthError::Store),
        }
    }

    async fn find_linked(
        &self,
        profile: &OAuthProfile,
        provider: OAuthProvider,
    ) -> Result<Option<User>, OAuthError> {
        self.store
            .find_by_provider_id(provider, &profile.id)
            .await
            .map_err(OAuthError::Store)
    }

    async fn link(
        &self,
        mut user: User,
        profile: &OAuthProfile,
        provider: OAuthProvider,
    ) -> Result<User, StoreError> {
        info!(user_id = %user.id, %provider, "Linking OAuth account to existing user");

        user.set_provider_id(provider, profile.id.clone());
        if user.avatar_url.is_none() {
            user.avatar_url = profile.picture_url.clone();
        }

        self.store.save(user).await
    }

    async fn create(&self, profile: &OAuthProfile, provider: OAuthProvider) -> Result<User, StoreError> {
        info!(%provider, "Creating new OAuth user");

        let mut user = User::new(NewUser {
            email: profile.email.clone(),
            first_name: profile.given_name.clone().unwrap_or_default(),
            last_name: profile.family_name.clone().unwrap_or_default(),
            password_hash: None,
            role: UserRole::Viewer,
            avatar_url: profile.picture_url.clone(),
            ..Default::default()
        });
        user.set_provider_id(provider, profile.id.clone());

        self.store.save(user).await
    }
}
