//! Error types for the todo MCP server

use std::io;

use thiserror::Error;

/// Result type alias for the todo MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// Process-level errors (startup, transport, token validation plumbing).
///
/// Tool-level failures are not represented here: they are [`crate::todo::TodoError`]
/// values returned to the caller as ordinary tool results.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// Error code
        code: i32,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a JSON-RPC error
    pub fn json_rpc(code: i32, message: impl Into<String>) -> Self {
        Self::JsonRpc {
            code,
            message: message.into(),
        }
    }

    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::JsonRpc { code, .. } => *code,
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::Protocol(_) => rpc_codes::INVALID_REQUEST,
            Self::Auth(_) => rpc_codes::UNAUTHORIZED,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Missing or rejected bearer token (server error range)
    pub const UNAUTHORIZED: i32 = -32001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rpc_error_keeps_its_code() {
        let err = Error::json_rpc(rpc_codes::INVALID_PARAMS, "bad args");
        assert_eq!(err.to_rpc_code(), -32602);
        assert_eq!(err.to_string(), "JSON-RPC error -32602: bad args");
    }

    #[test]
    fn auth_errors_map_to_unauthorized() {
        assert_eq!(Error::Auth("nope".into()).to_rpc_code(), rpc_codes::UNAUTHORIZED);
    }

    #[test]
    fn json_errors_map_to_parse_error() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.to_rpc_code(), rpc_codes::PARSE_ERROR);
    }

    #[test]
    fn everything_else_is_internal() {
        assert_eq!(Error::Config("x".into()).to_rpc_code(), rpc_codes::INTERNAL_ERROR);
        assert_eq!(Error::Internal("x".into()).to_rpc_code(), rpc_codes::INTERNAL_ERROR);
    }
}
