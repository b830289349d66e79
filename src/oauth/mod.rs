//! OAuth resource-server support
//!
//! This server never issues tokens. It validates bearer tokens issued by an
//! external provider and advertises that provider through RFC 9728
//! protected-resource metadata.
//!
//! Features:
//! - JWT verification against the provider JWKS (cached)
//! - Audience and issuer checks
//! - Scope extraction from `scope`, `scp` or `scopes` claims

mod error;
pub mod jwt;
mod metadata;
mod token;

use async_trait::async_trait;

pub use error::AuthError;
pub use jwt::{JwksCache, JwtVerifier, KeySource};
pub use metadata::ProtectedResourceMetadata;
pub use token::AccessToken;

/// Turns a raw bearer token into a validated [`AccessToken`].
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verify `token` and return the caller's identity and scopes.
    async fn verify(&self, token: &str) -> Result<AccessToken, AuthError>;
}
