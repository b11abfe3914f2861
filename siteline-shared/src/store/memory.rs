/// In-memory credential store
///
/// Keeps users in a `HashMap` behind a tokio `RwLock`. Uniqueness checks and
/// the write happen under the same write guard, so concurrent saves of the
/// same email or provider id resolve to exactly one winner.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, StoreResult, UniqueField, UserStore};
use crate::auth::oauth::OAuthProvider;
use crate::models::user::User;

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn conflicting_field(existing: &User, candidate: &User) -> Option<UniqueField> {
    if existing.email == candidate.email {
        return Some(UniqueField::Email);
    }

    let same = |a: &Option<String>, b: &Option<String>| matches!((a, b), (Some(a), Some(b)) if a == b);

    if same(&existing.google_id, &candidate.google_id) {
        return Some(UniqueField::GoogleId);
    }
    if same(&existing.microsoft_id, &candidate.microsoft_id) {
        return Some(UniqueField::MicrosoftId);
    }

    None
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_provider_id(
        &self,
        provider: OAuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.provider_id(provider) == Some(provider_id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save(&self, mut user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if let Some(field) = users
            .values()
            .filter(|existing| existing.id != user.id)
            .find_map(|existing| conflicting_field(existing, &user))
        {
            debug!(user_id = %user.id, %field, "Rejected save on unique constraint");
            return Err(StoreError::UniqueViolation { field });
        }

        if let Some(existing) = users.get(&user.id) {
            user.created_at = existing.created_at;
            user.updated_at = Utc::now();
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        user.is_active = is_active;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}
