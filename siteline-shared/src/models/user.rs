/// User model
///
/// This module provides the User identity record shared by every
/// authentication flow, the role enumeration, and the sanitized
/// representation that is the only user shape ever returned to callers.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM
///     ('admin', 'project_manager', 'contractor', 'supervisor', 'viewer');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     first_name VARCHAR(255) NOT NULL,
///     last_name VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'viewer',
///     google_id VARCHAR(255) UNIQUE,
///     microsoft_id VARCHAR(255) UNIQUE,
///     avatar_url VARCHAR(1024),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use siteline_shared::models::user::{NewUser, SanitizedUser, User, UserRole};
///
/// let user = User::new(NewUser {
///     email: "alice@x.com".to_string(),
///     first_name: "Alice".to_string(),
///     last_name: "Archer".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     role: UserRole::Viewer,
///     ..Default::default()
/// });
///
/// let public: SanitizedUser = user.into();
/// assert_eq!(public.email, "alice@x.com");
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::oauth::OAuthProvider;

/// Role assigned to a user
///
/// Roles are a flat set; route guards check membership in an allowed set
/// rather than a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full administrative access
    Admin,

    /// Manages projects, budgets and teams
    #[serde(alias = "manager")]
    ProjectManager,

    /// External contractor working on assigned tasks
    Contractor,

    /// Site supervisor
    Supervisor,

    /// Read-only access (lowest privilege, default for new accounts)
    #[default]
    Viewer,
}

impl UserRole {
    /// All roles, highest privilege first
    pub const ALL: [UserRole; 5] = [
        UserRole::Admin,
        UserRole::ProjectManager,
        UserRole::Contractor,
        UserRole::Supervisor,
        UserRole::Viewer,
    ];

    /// Gets role as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::ProjectManager => "project_manager",
            UserRole::Contractor => "contractor",
            UserRole::Supervisor => "supervisor",
            UserRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "project_manager" | "manager" => Ok(UserRole::ProjectManager),
            "contractor" => Ok(UserRole::Contractor),
            "supervisor" => Ok(UserRole::Supervisor),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User identity record
///
/// A user authenticates with a password, with one or more OAuth providers,
/// or both. `password_hash` is never serialized; use [`SanitizedUser`] for
/// anything leaving the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique and compared exactly as stored
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id digest, absent for OAuth-only accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub role: UserRole,

    /// Google account subject, unique when present
    pub google_id: Option<String>,

    /// Microsoft account id, unique when present
    pub microsoft_id: Option<String>,

    pub avatar_url: Option<String>,

    /// Inactive accounts cannot log in or refresh
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub google_id: Option<String>,
    pub microsoft_id: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// Builds a fresh, active user with a new ID and current timestamps
    ///
    /// The record is not persisted; hand it to a
    /// [`UserStore`](crate::store::UserStore) to save it.
    pub fn new(data: NewUser) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            password_hash: data.password_hash,
            role: data.role,
            google_id: data.google_id,
            microsoft_id: data.microsoft_id,
            avatar_url: data.avatar_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account can authenticate with a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Gets the linked account id for an OAuth provider
    pub fn provider_id(&self, provider: OAuthProvider) -> Option<&str> {
        match provider {
            OAuthProvider::Google => self.google_id.as_deref(),
            OAuthProvider::Microsoft => self.microsoft_id.as_deref(),
        }
    }

    /// Links an OAuth provider account id
    pub fn set_provider_id(&mut self, provider: OAuthProvider, id: String) {
        match provider {
            OAuthProvider::Google => self.google_id = Some(id),
            OAuthProvider::Microsoft => self.microsoft_id = Some(id),
        }
    }

    /// Number of configured authentication methods (password + providers)
    pub fn auth_methods_count(&self) -> usize {
        [
            self.password_hash.is_some(),
            self.google_id.is_some(),
            self.microsoft_id.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// User representation with the password digest removed
///
/// Every user object returned by an authentication flow or HTTP handler is
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub google_id: Option<String>,
    pub microsoft_id: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        let User {
            id,
            email,
            first_name,
            last_name,
            password_hash: _,
            role,
            google_id,
            microsoft_id,
            avatar_url,
            is_active,
            created_at,
            updated_at,
        } = user;

        Self {
            id,
            email,
            first_name,
            last_name,
            role,
            google_id,
            microsoft_id,
            avatar_url,
            is_active,
            created_at,
            updated_at,
        }
    }
}

impl From<&User> for SanitizedUser {
    fn from(user: &User) -> Self {
        user.clone().into()
    }
}
