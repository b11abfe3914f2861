/// User administration endpoints
///
/// - `PATCH /v1/admin/users/:id/active` - Activate or deactivate an account (admin)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use siteline_shared::{
    auth::{
        authorization::{require_auth, require_role},
        middleware::AuthContext,
    },
    models::user::{SanitizedUser, UserRole},
};
use tracing::info;
use uuid::Uuid;

/// Roles allowed to manage accounts
const USER_ADMIN_ROLES: &[UserRole] = &[UserRole::Admin];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Set a user's active flag
///
/// Deactivated users can no longer log in, refresh, or use existing access
/// tokens.
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user
pub async fn set_active(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<Json<SanitizedUser>> {
    let auth = require_auth(auth.as_deref())?;
    require_role(auth, USER_ADMIN_ROLES)?;

    let user = state.auth.set_user_active(user_id, req.is_active).await?;

    info!(admin_id = %auth.user_id, %user_id, is_active = req.is_active, "Admin changed user status");
    Ok(Json(user))
}
