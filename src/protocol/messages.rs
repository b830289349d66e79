//! JSON-RPC envelopes and MCP request/result payloads
//!
//! Incoming requests are parsed loosely as `serde_json::Value` by the router,
//! so only the response side of the envelope is typed here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Content, Info, ServerCapabilities, Tool};
use crate::Error;

/// JSON-RPC protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Request id: a string or an integer, echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String id
    String(String),
    /// Integer id
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Response envelope. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Id of the request answered; `null` when it could not be read
    pub id: Option<RequestId>,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying `result`.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Successful response carrying any serializable result.
    #[must_use]
    pub fn success_from<T: Serialize>(id: RequestId, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::from_error(Some(id), &Error::from(e)),
        }
    }

    /// Error response.
    pub fn error(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error response for a crate error, using its JSON-RPC code.
    ///
    /// [`Error::JsonRpc`] contributes its bare message; other variants their
    /// display text.
    #[must_use]
    pub fn from_error(id: Option<RequestId>, error: &Error) -> Self {
        let message = match error {
            Error::JsonRpc { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::error(id, error.to_rpc_code(), message)
    }
}

/// Error member of a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric code, see [`crate::error::rpc_codes`]
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Extra detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// initialize
// ============================================================================

/// `initialize` params.
///
/// Only the protocol version is read; capabilities and client info are kept
/// as raw JSON since this server offers nothing client-dependent.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    /// Version the client would like to speak
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Client capabilities
    #[serde(default)]
    pub capabilities: Value,
    /// Client implementation
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<Info>,
}

/// `initialize` result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Negotiated protocol version
    pub protocol_version: String,
    /// What this server offers
    pub capabilities: ServerCapabilities,
    /// This server's implementation
    pub server_info: Info,
    /// Usage hints for the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ============================================================================
// tools/*
// ============================================================================

/// `tools/list` result. The tool set is small, so it is never paginated.
#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    /// Advertised tools
    pub tools: Vec<Tool>,
}

/// `tools/call` params
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsCallParams {
    /// Tool to run
    #[serde(default)]
    pub name: String,
    /// Tool arguments (`null` when omitted)
    #[serde(default)]
    pub arguments: Value,
}

/// `tools/call` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCallResult {
    /// Human-readable rendering of the payload
    pub content: Vec<Content>,
    /// Machine-readable payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Set when the payload reports a failed operation
    #[serde(default)]
    pub is_error: bool,
}
