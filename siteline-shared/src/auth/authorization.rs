/// Authorization guards
///
/// Guards compose per endpoint: [`require_auth`] first, then
/// [`require_role`] with the set of roles the endpoint accepts. A role check
/// passes when the caller holds any one of the listed roles; roles are not
/// ordered.
///
/// # Example
///
/// ```
/// use siteline_shared::auth::authorization::{require_auth, require_role};
/// use siteline_shared::auth::middleware::AuthContext;
/// use siteline_shared::models::user::UserRole;
///
/// fn can_manage_users(auth: Option<&AuthContext>) -> bool {
///     require_auth(auth)
///         .and_then(|auth| require_role(auth, &[UserRole::Admin]))
///         .is_ok()
/// }
/// ```

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No authenticated identity on the request
    #[error("Authentication required")]
    Unauthenticated,

    /// Caller's role is outside the accepted set
    #[error("Insufficient permissions: requires one of {required:?}, has {actual}")]
    InsufficientRole {
        required: Vec<UserRole>,
        actual: UserRole,
    },
}

/// Requires an authenticated identity
pub fn require_auth(auth: Option<&AuthContext>) -> Result<&AuthContext, AuthzError> {
    auth.ok_or(AuthzError::Unauthenticated)
}

/// Requires the caller to hold one of `allowed`
///
/// An empty `allowed` set imposes no role restriction.
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.is_empty() || allowed.contains(&auth.role) {
        return Ok(());
    }

    Err(AuthzError::InsufficientRole {
        required: allowed.to_vec(),
        actual: auth.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "someone@x.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_auth() {
        let auth = context(UserRole::Viewer);

        assert_eq!(require_auth(Some(&auth)), Ok(&auth));
        assert_eq!(require_auth(None), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn test_require_role_any_of() {
        let allowed = [UserRole::Admin, UserRole::ProjectManager];

        assert!(require_role(&context(UserRole::Admin), &allowed).is_ok());
        assert!(require_role(&context(UserRole::ProjectManager), &allowed).is_ok());

        for role in [UserRole::Contractor, UserRole::Supervisor, UserRole::Viewer] {
            assert_eq!(
                require_role(&context(role), &allowed),
                Err(AuthzError::InsufficientRole {
                    required: allowed.to_vec(),
                    actual: role,
                })
            );
        }
    }

    #[test]
    fn test_admin_not_implicitly_privileged() {
        assert!(require_role(&context(UserRole::Admin), &[UserRole::Viewer]).is_err());
    }

    #[test]
    fn test_empty_role_set_allows_any() {
        for role in UserRole::ALL {
            assert!(require_role(&context(role), &[]).is_ok());
        }
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::InsufficientRole {
            required: vec![UserRole::Admin],
            actual: UserRole::Viewer,
        };
        assert!(err.to_string().contains("viewer"));
        assert_eq!(AuthzError::Unauthenticated.to_string(), "Authentication required");
    }
}
