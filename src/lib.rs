//! Todo MCP Server Library
//!
//! An MCP server exposing in-memory todo CRUD tools, each gated by an OAuth
//! scope. Tokens are issued by an external provider; this crate only
//! validates them.
//!
//! # Features
//!
//! - **Scope gate**: `todo:read` for reads, `todo:write` for mutations
//! - **Streamable HTTP**: stateless JSON-RPC on `POST /mcp`
//! - **OAuth resource server**: JWT validation against the provider JWKS,
//!   RFC 9728 protected-resource metadata
//! - **API keys**: static keys with per-key scopes for local development
//!
//! # Protocol Version
//!
//! Implements MCP protocol versions 2024-11-05, 2025-03-26 and 2025-06-18.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod protocol;
pub mod server;
pub mod todo;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. `format` is `"json"` or text.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
    }
}
