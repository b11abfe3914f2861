/// PostgreSQL credential store
///
/// Backs [`UserStore`] with the `users` table created by the migrations in
/// `migrations/`. Uniqueness of email and provider ids is enforced by the
/// table's unique constraints; violations (SQLSTATE `23505`) are mapped to
/// [`StoreError::UniqueViolation`].
///
/// # Example
///
/// ```no_run
/// use siteline_shared::db::pool::{create_pool, DatabaseConfig};
/// use siteline_shared::store::{PgUserStore, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgUserStore::new(pool);
/// let user = store.find_by_email("alice@x.com").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult, UniqueField, UserStore};
use crate::auth::oauth::OAuthProvider;
use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, role, \
                            google_id, microsoft_id, avatar_url, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps sqlx errors onto the store taxonomy
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            let field = if constraint.contains("google_id") {
                UniqueField::GoogleId
            } else if constraint.contains("microsoft_id") {
                UniqueField::MicrosoftId
            } else if constraint.contains("email") {
                UniqueField::Email
            } else {
                UniqueField::Id
            };
            return StoreError::UniqueViolation { field };
        }
    }

    StoreError::Database(err.to_string())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_provider_id(
        &self,
        provider: OAuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        // Column name comes from a closed enum, never from input.
        let column = UniqueField::for_provider(provider);

        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn save(&self, user: User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                google_id = EXCLUDED.google_id,
                microsoft_id = EXCLUDED.microsoft_id,
                avatar_url = EXCLUDED.avatar_url,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING {columns}
            "#,
            columns = USER_COLUMNS
        ))
        .bind(user.id)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.google_id)
        .bind(user.microsoft_id)
        .bind(user.avatar_url)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_opaque() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_provider_column_names() {
        assert_eq!(
            UniqueField::for_provider(OAuthProvider::Google).to_string(),
            "google_id"
        );
        assert_eq!(
            UniqueField::for_provider(OAuthProvider::Microsoft).to_string(),
            "microsoft_id"
        );
    }

    // Round-trip tests against a live database are in tests/pg_user_store_tests.rs
}
