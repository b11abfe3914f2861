/// Authentication middleware for Axum
///
/// Extracts the `Authorization: Bearer <token>` header, verifies it as an
/// access token, re-loads the active user through [`AuthService::authenticate`],
/// and adds two request extensions:
///
/// - [`AuthContext`]: identity and role used by the guards in
///   [`super::authorization`]
/// - [`SanitizedUser`]: the current user record, for handlers such as `/me`
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use siteline_shared::auth::middleware::{create_jwt_middleware, AuthContext};
/// use siteline_shared::auth::service::AuthService;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.email, auth.role)
/// }
///
/// fn protected(service: AuthService) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn(create_jwt_middleware(service)))
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use super::jwt::Claims;
use super::service::{AuthError, AuthService};
use crate::models::user::{SanitizedUser, UserRole};

/// Authenticated identity added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&Claims> for AuthContext {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

impl From<&SanitizedUser> for AuthContext {
    fn from(user: &SanitizedUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Rejection produced by the JWT middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// Missing authorization header
    MissingCredentials,

    /// Header present but not a Bearer token
    InvalidFormat(String),

    /// Token or subject failed verification
    InvalidToken(String),

    /// Store failure while loading the subject
    Internal(String),
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => AuthRejection::Internal(msg),
            AuthError::NotFound(_) => AuthRejection::InvalidToken("User not found".to_string()),
            other => AuthRejection::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthRejection::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthRejection::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthRejection::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AuthRejection::Internal(msg) => {
                tracing::error!("Authentication backend failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// Extracts the bearer token from the Authorization header
pub fn bearer_token(req: &Request) -> Result<&str, AuthRejection> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthRejection::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthRejection::InvalidFormat("Expected Bearer token".to_string()))
}

/// JWT authentication middleware
///
/// # Errors
///
/// - 401 if the header is missing, the token is invalid, expired or a
///   refresh token, or the subject is missing or inactive
/// - 400 if the header is not a Bearer token
pub async fn jwt_auth_middleware(
    service: AuthService,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = bearer_token(&req)?;
    let user = service.authenticate(token).await?;

    req.extensions_mut().insert(AuthContext::from(&user));
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthRejection>> + Send>>;

/// Creates a JWT authentication middleware closure for `middleware::from_fn`
pub fn create_jwt_middleware(service: AuthService) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    move |req, next| {
        let service = service.clone();
        Box::pin(jwt_auth_middleware(service, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenType;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_auth_context_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id,
            email: "alice@x.com".to_string(),
            role: UserRole::Supervisor,
            iss: "siteline".to_string(),
            iat: 0,
            nbf: 0,
            exp: 3600,
            token_type: TokenType::Access,
        };

        let context = AuthContext::from(&claims);

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.email, "alice@x.com");
        assert_eq!(context.role, UserRole::Supervisor);
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(
            bearer_token(&request_with_auth(Some("Bearer abc.def.ghi"))),
            Ok("abc.def.ghi")
        );
        assert_eq!(
            bearer_token(&request_with_auth(None)),
            Err(AuthRejection::MissingCredentials)
        );
        assert!(matches!(
            bearer_token(&request_with_auth(Some("Basic dXNlcjpwYXNz"))),
            Err(AuthRejection::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&request_with_auth(Some("Bearer "))),
            Err(AuthRejection::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejection_into_response() {
        let response = AuthRejection::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthRejection::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthRejection::Internal("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejection_from_auth_error() {
        assert_eq!(
            AuthRejection::from(AuthError::NotFound("gone".to_string())),
            AuthRejection::InvalidToken("User not found".to_string())
        );
        assert_eq!(
            AuthRejection::from(AuthError::Unauthorized("Account is inactive".to_string())),
            AuthRejection::InvalidToken("Account is inactive".to_string())
        );
        assert!(matches!(
            AuthRejection::from(AuthError::Internal("db".to_string())),
            AuthRejection::Internal(_)
        ));
    }
}
