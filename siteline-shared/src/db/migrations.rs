/// Database migration runner
///
/// Migrations live in `migrations/` at the workspace root and are embedded at
/// compile time with `sqlx::migrate!`.

use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    /// Latest applied version (timestamp prefix of the file name)
    pub latest_version: Option<i64>,
}

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails to apply or an applied migration
/// was modified after it ran.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("Database migrations complete");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Reads the applied-migration summary from `_sqlx_migrations`
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
    })
}
