//! Authentication middleware for the todo MCP server
//!
//! Supports:
//! - Static API keys with per-key scopes
//! - Provider-issued JWT access tokens (via [`TokenVerifier`])
//! - Public paths that bypass authentication
//!
//! A successfully authenticated request carries an [`AccessToken`] in its
//! extensions; tool handlers read scopes from it.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::rpc_codes;
use crate::oauth::{AccessToken, AuthError, JwtVerifier, TokenVerifier};
use crate::todo::ScopeSet;

/// Resolved authentication configuration (keys expanded, verifier built)
pub struct ResolvedAuthConfig {
    /// Whether auth is enabled
    pub enabled: bool,
    /// Resolved API keys
    pub api_keys: Vec<ResolvedApiKey>,
    /// Public paths
    pub public_paths: Vec<String>,
    /// Scopes granted when auth is disabled
    pub anonymous_scopes: ScopeSet,
    /// Value of the `WWW-Authenticate` header on 401 responses
    pub challenge: String,
    /// JWT verifier, when an OAuth provider is configured
    verifier: Option<Arc<dyn TokenVerifier>>,
}

/// Resolved API key with expanded values
#[derive(Debug, Clone)]
pub struct ResolvedApiKey {
    /// The actual key value
    pub key: String,
    /// Client name
    pub name: String,
    /// Granted scopes
    pub scopes: ScopeSet,
}

impl ResolvedAuthConfig {
    /// Create resolved config from the loaded [`Config`]
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let api_keys = config
            .auth
            .api_keys
            .iter()
            .map(|k| ResolvedApiKey {
                key: k.resolve_key(),
                name: k.name.clone(),
                scopes: k.scopes.iter().cloned().collect(),
            })
            .filter(|k| !k.key.is_empty())
            .collect();

        let verifier: Option<Arc<dyn TokenVerifier>> = config
            .oauth
            .is_configured()
            .then(|| Arc::new(JwtVerifier::from_config(&config.oauth)) as Arc<dyn TokenVerifier>);

        Self {
            enabled: config.auth.enabled,
            api_keys,
            public_paths: config.auth.public_paths.clone(),
            anonymous_scopes: config.auth.anonymous_scopes.iter().cloned().collect(),
            challenge: challenge_header(&config.oauth.resource_metadata_url()),
            verifier,
        }
    }

    /// Replace the token verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Check if a path is public (bypasses auth)
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            if p.ends_with('/') {
                path.starts_with(p.as_str())
            } else {
                path.strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
        })
    }

    /// Match `token` against the configured API keys in constant time.
    #[must_use]
    pub fn match_api_key(&self, token: &str) -> Option<AccessToken> {
        self.api_keys
            .iter()
            .find(|k| bool::from(k.key.as_bytes().ct_eq(token.as_bytes())))
            .map(|k| AccessToken::api_key(&k.name, k.scopes.clone()))
    }

    /// Validate a bearer token: API keys first, then the JWT verifier.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] explaining why the token was rejected.
    pub async fn validate_token(&self, token: &str) -> Result<AccessToken, AuthError> {
        if let Some(access) = self.match_api_key(token) {
            return Ok(access);
        }

        match self.verifier {
            Some(ref verifier) => verifier.verify(token).await,
            None => Err(AuthError::InvalidToken),
        }
    }
}

/// `WWW-Authenticate` value pointing clients at the resource metadata.
fn challenge_header(resource_metadata_url: &str) -> String {
    format!(r#"Bearer realm="OAuth", resource_metadata="{resource_metadata_url}""#)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim_start().split_once(|c: char| c.is_ascii_whitespace()))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(auth_config): State<Arc<ResolvedAuthConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // If auth is disabled, pass through with the anonymous token
    if !auth_config.enabled {
        request
            .extensions_mut()
            .insert(AccessToken::anonymous(auth_config.anonymous_scopes.clone()));
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();

    if auth_config.is_public_path(&path) {
        debug!(path = %path, "Public path, skipping auth");
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        warn!(path = %path, "Missing Authorization header");
        return unauthorized_response(&auth_config.challenge, &AuthError::MissingToken);
    };

    match auth_config.validate_token(token).await {
        Ok(access) => {
            debug!(client = %access.display_name(), scopes = %access.scopes, path = %path, "Authenticated request");
            request.extensions_mut().insert(access);
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Token rejected");
            unauthorized_response(&auth_config.challenge, &e)
        }
    }
}

/// Create a 401 Unauthorized response
fn unauthorized_response(challenge: &str, error: &AuthError) -> Response {
    let challenge =
        HeaderValue::from_str(challenge).unwrap_or_else(|_| HeaderValue::from_static("Bearer"));
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": rpc_codes::UNAUTHORIZED,
                "message": error.to_string()
            },
            "id": null
        })),
    )
        .into_response()
}
