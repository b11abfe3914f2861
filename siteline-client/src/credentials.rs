/// Caller-owned token holder

use std::fmt;

/// Access and refresh tokens for one session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[redacted]");

        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials restored from storage
    pub fn from_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub(crate) fn set_session(&mut self, access_token: String, refresh_token: String) {
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
    }

    pub(crate) fn set_access_token(&mut self, access_token: String) {
        self.access_token = Some(access_token);
    }

    /// Forgets both tokens
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut credentials = Credentials::new();
        assert!(!credentials.is_authenticated());

        credentials.set_session("access".to_string(), "refresh".to_string());
        assert!(credentials.is_authenticated());
        assert_eq!(credentials.refresh_token(), Some("refresh"));

        credentials.set_access_token("access-2".to_string());
        assert_eq!(credentials.access_token(), Some("access-2"));
        assert_eq!(credentials.refresh_token(), Some("refresh"));

        credentials.clear();
        assert_eq!(credentials, Credentials::new());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credentials = Credentials::from_tokens("secret-access", "secret-refresh");
        let debug = format!("{:?}", credentials);

        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("[redacted]"));
    }
}
