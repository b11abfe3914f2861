/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register with email and password
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
/// - `POST /v1/auth/oauth/:provider/callback` - Complete an OAuth login
/// - `GET /v1/auth/me` - Current user (JWT)
///
/// Request bodies use camelCase keys, matching the web client.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use siteline_shared::{
    auth::{
        oauth::{OAuthProfile, OAuthProvider},
        password::validate_password_strength,
        service::{AuthError, AuthResponse, RefreshResponse, RegisterInput},
    },
    models::user::SanitizedUser,
};
use validator::{Validate, ValidationError};

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(
        length(max = 100, message = "First name is too long"),
        custom(function = "not_blank", message = "First name is required")
    )]
    pub first_name: String,

    #[validate(
        length(max = 100, message = "Last name is too long"),
        custom(function = "not_blank", message = "Last name is required")
    )]
    pub last_name: String,

    #[validate(custom(function = "password_strength"))]
    pub password: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn password_strength(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(|message| {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(message.into());
        err
    })
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
///
/// { "email": "alice@x.com", "firstName": "Alice", "lastName": "Archer", "password": "Passw0rd1" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let response = state
        .auth
        .register(RegisterInput {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials, inactive account, or OAuth-only account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let response = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    req.validate()?;

    let response = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(response))
}

/// Complete an OAuth login with an already-exchanged provider profile
///
/// ```text
/// POST /v1/auth/oauth/google/callback
///
/// { "id": "g-123", "email": "grace@x.com", "givenName": "Grace", "picture": "https://..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown provider or a profile without id or email
/// - `401 Unauthorized`: Account is inactive
/// - `409 Conflict`: Identity conflicts with another account
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(profile): Json<OAuthProfile>,
) -> ApiResult<Json<AuthResponse>> {
    let provider: OAuthProvider = provider.parse().map_err(AuthError::from)?;

    let response = state.auth.oauth_callback(provider, &profile).await?;
    Ok(Json(response))
}

/// Current user, as loaded by the JWT middleware
pub async fn me(Extension(user): Extension<SanitizedUser>) -> Json<SanitizedUser> {
    Json(user)
}
