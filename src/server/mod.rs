//! HTTP server: Streamable HTTP MCP endpoint, auth middleware and discovery

pub mod auth;
mod listener;
mod router;
pub mod tools;

pub use auth::{ResolvedAuthConfig, auth_middleware};
pub use listener::TodoServer;
pub use router::{AppState, create_router};
pub use tools::{TodoTools, ToolOutput};
