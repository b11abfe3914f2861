/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded sqlx migration runner
///
/// The `users` table queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
