/// Configuration management for the API server
///
/// Loaded from environment variables (and a `.env` file when present).
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3001)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: http://localhost:3000)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (optional; in-memory store when unset)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: Access token lifetime (default: 1h)
/// - `REFRESH_TOKEN_EXPIRES_IN`: Refresh token lifetime (default: 7d)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: Hashing cost
/// - `OAUTH_REQUIRE_ACTIVE`: Reject OAuth logins to inactive accounts (default: true)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for human-readable
///
/// Lifetimes use the form `<n>[s|m|h|d]`; a bare number is seconds.
///
/// # Example
///
/// ```no_run
/// use siteline_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use chrono::Duration;
use siteline_shared::auth::password::HashParams;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    /// Absent when the server runs on the in-memory store
    pub database: Option<DatabaseConfig>,

    pub jwt: JwtConfig,

    pub hashing: HashParams,

    pub auth: AuthConfig,

    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[redacted]")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// JWT configuration
#[derive(Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl: Duration,

    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Auth policy switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    pub oauth_require_active: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or too short, or any
    /// variable has an unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from a key/value map
    pub fn from_map(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let defaults = HashParams::default();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(var("API_PORT"), "API_PORT", 3001)?,
                cors_origins,
                production: parse_bool(var("PRODUCTION"), "PRODUCTION", false)?,
            },
            database,
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl: parse_ttl(var("JWT_EXPIRES_IN"), "JWT_EXPIRES_IN", Duration::hours(1))?,
                refresh_ttl: parse_ttl(
                    var("REFRESH_TOKEN_EXPIRES_IN"),
                    "REFRESH_TOKEN_EXPIRES_IN",
                    Duration::days(7),
                )?,
            },
            hashing: HashParams {
                memory_kib: parse_or(var("ARGON2_MEMORY_KIB"), "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(var("ARGON2_ITERATIONS"), "ARGON2_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(var("ARGON2_PARALLELISM"), "ARGON2_PARALLELISM", defaults.parallelism)?,
            },
            auth: AuthConfig {
                oauth_require_active: parse_bool(var("OAUTH_REQUIRE_ACTIVE"), "OAUTH_REQUIRE_ACTIVE", true)?,
            },
            log_format: match var("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS allows any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{} must be a boolean, got {}", key, v),
    }
}

fn parse_ttl(value: Option<String>, key: &str, default: Duration) -> anyhow::Result<Duration> {
    match value {
        Some(raw) => parse_duration(&raw).with_context(|| format!("{} has an invalid value", key)),
        None => Ok(default),
    }
}

/// Longest accepted token lifetime
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 365;

fn max_token_lifetime() -> Duration {
    Duration::days(MAX_TOKEN_LIFETIME_DAYS)
}

/// Parses a lifetime such as `15m`, `1h` or `7d`, up to one year
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };

    let amount: i64 = digits
        .parse()
        .with_context(|| format!("Invalid duration: {}", raw))?;
    if amount <= 0 {
        anyhow::bail!("Duration must be positive: {}", raw);
    }

    let duration = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        other => anyhow::bail!("Unknown duration unit '{}' in {}", other, raw),
    };

    match duration {
        Some(duration) if duration <= max_token_lifetime() => Ok(duration),
        _ => anyhow::bail!(
            "Duration {} exceeds the maximum of {} days",
            raw,
            MAX_TOKEN_LIFETIME_DAYS
        ),
    }
}
