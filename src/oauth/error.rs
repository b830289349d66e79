//! Token validation errors

/// Reasons a bearer token is rejected.
///
/// Every variant ends up as `401 Unauthorized`; the message is logged and
/// returned in the JSON-RPC error body.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header
    #[error("Missing Authorization header. Use: Authorization: Bearer <token>")]
    MissingToken,

    /// The token matched no API key and no JWT verifier is configured
    #[error("Invalid token")]
    InvalidToken,

    /// JWT decode / signature / claim verification failed
    #[error("JWT verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The JWT header has no `kid`
    #[error("JWT missing 'kid' field in header")]
    MissingKeyId,

    /// The `kid` is not in the provider's JWKS, even after a refresh
    #[error("Unknown key ID: {0}")]
    UnknownKeyId(String),

    /// The JWT is signed with an algorithm this server does not accept
    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token's audience does not include this resource
    #[error("Token audience does not include {0}")]
    InvalidAudience(String),

    /// Network or HTTP error while fetching the JWKS
    #[error("JWKS fetch error: {0}")]
    Jwks(#[from] reqwest::Error),
}
