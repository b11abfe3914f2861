/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use siteline_api::{app::{build_router, AppState, StoreBackend}, config::Config};
/// use siteline_shared::auth::clock::SystemClock;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::build(config, StoreBackend::memory(), Arc::new(SystemClock))?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use siteline_shared::auth::{
    clock::Clock,
    jwt::{TokenConfig, TokenIssuer},
    middleware::create_jwt_middleware,
    oauth::OAuthResolver,
    password::Argon2Hasher,
    service::{AuthPolicy, AuthService},
};
use siteline_shared::store::{InMemoryUserStore, PgUserStore, UserStore};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Credential store the server runs on
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory(Arc<InMemoryUserStore>),
    Postgres(PgUserStore),
}

impl StoreBackend {
    /// A fresh, empty in-memory store
    pub fn memory() -> Self {
        StoreBackend::Memory(Arc::new(InMemoryUserStore::new()))
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        match self {
            StoreBackend::Memory(store) => store.clone(),
            StoreBackend::Postgres(store) => Arc::new(store.clone()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Postgres(_) => "postgres",
        }
    }
}

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,

    pub store: StoreBackend,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: AuthService, store: StoreBackend, config: Config) -> Self {
        Self {
            auth,
            store,
            config: Arc::new(config),
        }
    }

    /// Wires the auth orchestrator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the Argon2 parameters are rejected.
    pub fn build(config: Config, store: StoreBackend, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let user_store = store.user_store();

        let tokens = TokenIssuer::new(
            TokenConfig {
                secret: config.jwt.secret.clone(),
                access_ttl: config.jwt.access_ttl,
                refresh_ttl: config.jwt.refresh_ttl,
            },
            clock,
        );

        let auth = AuthService::new(
            user_store.clone(),
            Arc::new(Argon2Hasher::new(config.hashing)?),
            tokens,
            OAuthResolver::new(user_store),
            AuthPolicy {
                require_active_for_oauth: config.auth.oauth_require_active,
            },
        )?;

        Ok(Self::new(auth, store, config))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /refresh
///     │   ├── POST /oauth/:provider/callback
///     │   └── GET  /me                       (JWT)
///     └── /admin/
///         └── PATCH /users/:id/active        (JWT, admin)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let jwt = axum::middleware::from_fn(create_jwt_middleware(state.auth.clone()));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/oauth/:provider/callback", post(routes::auth::oauth_callback));

    let protected_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(jwt.clone());

    let admin_routes = Router::new()
        .route("/users/:id/active", patch(routes::users::set_active))
        .route_layer(jwt);

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
