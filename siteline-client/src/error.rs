/// Client error type

use serde::Deserialize;

/// Error returned by [`crate::ApiClient`] calls
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport or body decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Call needs a token the credentials do not hold
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// HTTP status for `Api` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Error body rendered by the API
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub message: String,
}
