/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "store": "postgres",
///   "database": "connected"
/// }
/// ```
///
/// `database` is omitted when the server runs on the in-memory store.

use crate::app::{AppState, StoreBackend};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use siteline_shared::db::pool::health_check as database_health_check;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// Credential store backend (`memory` or `postgres`)
    pub store: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.store {
        StoreBackend::Memory(_) => None,
        StoreBackend::Postgres(store) => Some(match database_health_check(store.pool()).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "disconnected"
            }
        }),
    };

    Json(HealthResponse {
        status: if database == Some("disconnected") {
            "degraded".to_string()
        } else {
            "healthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.name().to_string(),
        database: database.map(str::to_string),
    })
}
