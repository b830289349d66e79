//! Access-token verification: JWT signature validation and JWKS caching.
//!
//! # Verification flow
//!
//! 1. Decode the JWT header (no verification) to read `kid` and `alg`.
//! 2. Fetch the provider's JWKS (cached; refreshed once on unknown `kid`).
//! 3. Verify the signature and the `exp`/`nbf`/`iss` claims.
//! 4. Check that `aud` contains this server's resource id.
//! 5. Collect scopes from `scope` (space-delimited), `scp` or `scopes`.
//!
//! Clock leeway of 60 seconds tolerates minor skew between the provider and
//! this host.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{
    Algorithm, DecodingKey, TokenData, Validation,
    jwk::{AlgorithmParameters, JwkSet},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{AccessToken, AuthError, TokenVerifier};
use crate::config::OAuthConfig;
use crate::todo::ScopeSet;

/// Clock skew tolerance for `exp` / `nbf`
const LEEWAY_SECS: u64 = 60;

/// Claims read from a provider-issued access token.
#[derive(Debug, Clone, Deserialize)]
struct AccessClaims {
    #[serde(default)]
    sub: Option<String>,
    /// Audience (single string or array)
    #[serde(default)]
    aud: Value,
    /// Expiry, already enforced by `jsonwebtoken`
    #[serde(default)]
    exp: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    scp: Option<ScopeClaim>,
    #[serde(default)]
    scopes: Option<ScopeClaim>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    azp: Option<String>,
}

/// Scope claims show up both as `"a b"` and as `["a", "b"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    Delimited(String),
    List(Vec<String>),
}

impl AccessClaims {
    fn granted_scopes(&self) -> ScopeSet {
        let mut granted = self
            .scope
            .as_deref()
            .map(ScopeSet::from_space_delimited)
            .unwrap_or_default();
        for claim in [&self.scp, &self.scopes].into_iter().flatten() {
            match claim {
                ScopeClaim::Delimited(raw) => {
                    for scope in raw.split_whitespace() {
                        granted.insert(scope);
                    }
                }
                ScopeClaim::List(list) => {
                    for scope in list {
                        granted.insert(scope.as_str());
                    }
                }
            }
        }
        granted
    }

    fn into_access_token(self) -> AccessToken {
        let scopes = self.granted_scopes();
        AccessToken {
            subject: self.sub,
            client_id: self.client_id.or(self.azp),
            scopes,
            expires_at: self.exp,
        }
    }
}

/// Cached JWKS entry.
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// JWKS cache, one entry per JWKS URI.
pub struct JwksCache {
    inner: DashMap<String, CachedJwks>,
    http: reqwest::Client,
    ttl: Duration,
}

impl JwksCache {
    /// Create a cache that reuses a fetched key set for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: DashMap::new(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            ttl,
        }
    }

    /// Return the cached JWKS for `jwks_uri`, fetching it when stale or when
    /// `force_refresh` is set.
    pub async fn get_or_fetch(
        &self,
        jwks_uri: &str,
        force_refresh: bool,
    ) -> Result<JwkSet, AuthError> {
        if !force_refresh {
            if let Some(cached) = self.inner.get(jwks_uri) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.keys.clone());
                }
            }
        }

        debug!(jwks_uri = %jwks_uri, "Fetching JWKS");
        let jwks: JwkSet = self
            .http
            .get(jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        self.inner.insert(
            jwks_uri.to_string(),
            CachedJwks {
                keys: jwks.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(jwks)
    }
}

/// Where signature verification keys come from.
pub enum KeySource {
    /// Provider JWKS endpoint
    Jwks {
        /// JWKS URL
        uri: String,
        /// Fetched key sets
        cache: JwksCache,
    },
    /// A single fixed key (shared-secret or PEM), no `kid` lookup
    Static {
        /// Verification key
        key: DecodingKey,
        /// Accepted algorithm
        algorithm: Algorithm,
    },
}

/// Verifies provider-issued JWT access tokens.
pub struct JwtVerifier {
    issuer: String,
    audience: String,
    keys: KeySource,
}

impl JwtVerifier {
    /// Create a verifier for `issuer`/`audience` using `keys`.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, keys: KeySource) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys,
        }
    }

    /// Verifier backed by the provider JWKS described in `config`.
    #[must_use]
    pub fn from_config(config: &OAuthConfig) -> Self {
        Self::new(
            config.issuer(),
            config.resource_id.clone(),
            KeySource::Jwks {
                uri: config.jwks_uri(),
                cache: JwksCache::new(config.jwks_cache_ttl),
            },
        )
    }

    /// Pick the decoding key and algorithm for a token.
    async fn resolve_key(&self, token: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        let header = jsonwebtoken::decode_header(token)?;

        match &self.keys {
            KeySource::Static { key, algorithm } => Ok((key.clone(), *algorithm)),
            KeySource::Jwks { uri, cache } => {
                let algorithm = asymmetric_algorithm(header.alg)?;
                let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
                let key = find_decoding_key(cache, uri, &kid).await?;
                Ok((key, algorithm))
            }
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<AccessToken, AuthError> {
        let (key, algorithm) = self.resolve_key(token).await?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = LEEWAY_SECS;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Audience is checked below to accept both string and array forms.
        validation.validate_aud = false;

        let data: TokenData<AccessClaims> = jsonwebtoken::decode(token, &key, &validation)?;
        check_audience(&data.claims.aud, &self.audience)?;

        let access = data.claims.into_access_token();
        debug!(
            subject = access.display_name(),
            scopes = %access.scopes,
            "Verified access token"
        );
        Ok(access)
    }
}

/// Find a decoding key by `kid`, refreshing the JWKS once if it is unknown.
async fn find_decoding_key(
    cache: &JwksCache,
    uri: &str,
    kid: &str,
) -> Result<DecodingKey, AuthError> {
    let jwks = cache.get_or_fetch(uri, false).await?;
    if let Some(key) = find_key_in_jwks(&jwks, kid) {
        return Ok(key);
    }

    debug!(kid = %kid, "Key not found in cached JWKS, refreshing");
    let jwks = cache.get_or_fetch(uri, true).await?;
    find_key_in_jwks(&jwks, kid).ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
}

/// Find a JWK by `kid` and convert it to a `DecodingKey`.
fn find_key_in_jwks(jwks: &JwkSet, kid: &str) -> Option<DecodingKey> {
    let jwk = jwks
        .keys
        .iter()
        .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        AlgorithmParameters::EllipticCurve(ec) => {
            DecodingKey::from_ec_components(&ec.x, &ec.y).ok()
        }
        _ => None,
    }
}

/// JWKS-published keys are asymmetric; refuse `HS*` and anything exotic.
fn asymmetric_algorithm(alg: Algorithm) -> Result<Algorithm, AuthError> {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512
        | Algorithm::ES256
        | Algorithm::ES384 => Ok(alg),
        other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
    }
}

/// Validate that the token's `aud` claim contains the expected audience.
fn check_audience(aud_claim: &Value, expected: &str) -> Result<(), AuthError> {
    let matches = match aud_claim {
        Value::String(s) => s == expected,
        Value::Array(arr) => arr.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    };

    if matches {
        Ok(())
    } else {
        Err(AuthError::InvalidAudience(expected.to_string()))
    }
}
