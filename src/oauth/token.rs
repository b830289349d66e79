//! Validated access token attached to each authenticated request

use serde::Serialize;

use crate::todo::ScopeSet;

/// Identity and scopes of the caller, produced by a [`super::TokenVerifier`].
///
/// The raw bearer value is never stored here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccessToken {
    /// `sub` claim, or the API key name for static keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// OAuth client that obtained the token (`client_id` or `azp` claim)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Granted scopes
    pub scopes: ScopeSet,
    /// Expiry (Unix epoch seconds), when the token carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl AccessToken {
    /// Token for unauthenticated requests when auth is disabled.
    #[must_use]
    pub fn anonymous(scopes: ScopeSet) -> Self {
        Self {
            subject: Some("anonymous".to_string()),
            scopes,
            ..Self::default()
        }
    }

    /// Token for a request that presented a static API key.
    #[must_use]
    pub fn api_key(name: &str, scopes: ScopeSet) -> Self {
        Self {
            subject: Some(name.to_string()),
            client_id: Some(name.to_string()),
            scopes,
            expires_at: None,
        }
    }

    /// Name to use in logs.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.subject
            .as_deref()
            .or(self.client_id.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_token_carries_given_scopes() {
        let token = AccessToken::anonymous(["todo:read"].into_iter().collect());
        assert!(token.scopes.contains("todo:read"));
        assert_eq!(token.display_name(), "anonymous");
    }

    #[test]
    fn display_name_falls_back_to_client_id() {
        let token = AccessToken {
            client_id: Some("skc_42".into()),
            ..AccessToken::default()
        };
        assert_eq!(token.display_name(), "skc_42");
        assert_eq!(AccessToken::default().display_name(), "unknown");
    }
}
