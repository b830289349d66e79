//! Todo tools exposed over MCP
//!
//! Each tool maps to one [`Operation`]. Arguments are deserialized into typed
//! structs; the store performs the scope check and the outcome is wrapped as
//! a `tools/call` result.

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::rpc_codes;
use crate::protocol::{
    Content, Info, InitializeParams, InitializeResult, JsonRpcResponse, RequestId,
    ServerCapabilities, Tool, ToolAnnotations, ToolsCallResult, ToolsCapability, ToolsListResult,
    negotiate_version,
};
use crate::todo::{Operation, ScopeSet, TodoError, TodoItem, TodoPatch, TodoStore};
use crate::{Error, Result};

/// Instructions returned from `initialize`
const INSTRUCTIONS: &str = "Manage todo items. Reading requires the todo:read scope; \
creating, updating and deleting require todo:write.";

// ============================================================================
// Tool arguments
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListArgs {
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TodoIdArgs {
    todo_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    todo_id: String,
    #[serde(flatten)]
    patch: TodoPatch,
}

/// Parse tool arguments; a missing `arguments` member counts as `{}`.
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| {
        Error::json_rpc(
            rpc_codes::INVALID_PARAMS,
            format!("Invalid arguments for {tool}: {e}"),
        )
    })
}

// ============================================================================
// Tool output
// ============================================================================

/// Payload of a tool result, serialized as a single-key object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutput {
    /// `{"todo": {...}}`
    Todo(TodoItem),
    /// `{"todos": [...]}`
    Todos(Vec<TodoItem>),
    /// `{"deleted": "<id>"}`
    Deleted(String),
    /// `{"error": "<message>"}`
    Error(String),
}

impl ToolOutput {
    /// Whether this payload reports a failed operation.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Wrap as a `tools/call` result.
    #[must_use]
    pub fn into_call_result(self) -> ToolsCallResult {
        let is_error = self.is_error();
        let structured = serde_json::to_value(&self).unwrap_or_default();
        ToolsCallResult {
            content: vec![Content::text(
                serde_json::to_string_pretty(&structured).unwrap_or_default(),
            )],
            structured_content: Some(structured),
            is_error,
        }
    }
}

impl From<std::result::Result<ToolOutput, TodoError>> for ToolOutput {
    fn from(result: std::result::Result<ToolOutput, TodoError>) -> Self {
        result.unwrap_or_else(|e| Self::Error(e.to_string()))
    }
}

// ============================================================================
// Tool definitions
// ============================================================================

fn todo_id_property() -> Value {
    json!({
        "type": "string",
        "description": "Identifier returned by create_todo"
    })
}

/// Build the advertised definition for one operation.
fn build_tool(op: Operation) -> Tool {
    let (title, description, input_schema) = match op {
        Operation::Create => (
            "Create Todo",
            "Create a new todo item. Requires the todo:write scope.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Todo title"},
                    "description": {"type": "string", "description": "Optional details"}
                },
                "required": ["title"]
            }),
        ),
        Operation::List => (
            "List Todos",
            "List todo items in creation order, optionally filtered by completion state. \
             Requires the todo:read scope.",
            json!({
                "type": "object",
                "properties": {
                    "completed": {
                        "type": "boolean",
                        "description": "Only return todos with this completion state"
                    }
                },
                "required": []
            }),
        ),
        Operation::Get => (
            "Get Todo",
            "Fetch a single todo item by id. Requires the todo:read scope.",
            json!({
                "type": "object",
                "properties": {"todo_id": todo_id_property()},
                "required": ["todo_id"]
            }),
        ),
        Operation::Update => (
            "Update Todo",
            "Update fields of a todo item. Omitted fields keep their value. \
             Requires the todo:write scope.",
            json!({
                "type": "object",
                "properties": {
                    "todo_id": todo_id_property(),
                    "title": {"type": "string", "description": "New title"},
                    "description": {"type": "string", "description": "New description"},
                    "completed": {"type": "boolean", "description": "New completion state"}
                },
                "required": ["todo_id"]
            }),
        ),
        Operation::Delete => (
            "Delete Todo",
            "Delete a todo item by id. Requires the todo:write scope.",
            json!({
                "type": "object",
                "properties": {"todo_id": todo_id_property()},
                "required": ["todo_id"]
            }),
        ),
    };

    Tool::new(op.tool_name(), title, description, input_schema).with_annotations(ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: Some(op.is_read_only()),
        destructive_hint: Some(op == Operation::Delete),
        idempotent_hint: Some(op != Operation::Create),
        open_world_hint: Some(false),
    })
}

/// All tool definitions, in advertised order.
#[must_use]
pub fn build_tools() -> Vec<Tool> {
    Operation::ALL.into_iter().map(build_tool).collect()
}

/// Build the `initialize` result for a negotiated protocol version.
#[must_use]
pub fn build_initialize_result(protocol_version: &str) -> InitializeResult {
    InitializeResult {
        protocol_version: protocol_version.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: Info {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Todo MCP Server".to_string()),
        },
        instructions: Some(INSTRUCTIONS.to_string()),
    }
}

// ============================================================================
// Handler
// ============================================================================

/// JSON-RPC handler for the todo tools
pub struct TodoTools {
    store: Arc<TodoStore>,
}

impl TodoTools {
    /// Create a handler over a shared store
    #[must_use]
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }

    /// The shared store
    #[must_use]
    pub fn store(&self) -> &Arc<TodoStore> {
        &self.store
    }

    /// Handle initialize request with version negotiation
    #[must_use]
    pub fn handle_initialize(id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
        let client_version = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok())
            .map(|p| p.protocol_version);
        let negotiated_version = negotiate_version(client_version.as_deref());
        debug!(
            client = client_version.as_deref(),
            negotiated = negotiated_version,
            "Protocol version negotiation"
        );

        JsonRpcResponse::success_from(id, &build_initialize_result(negotiated_version))
    }

    /// Handle tools/list request
    #[must_use]
    pub fn handle_tools_list(id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success_from(id, &ToolsListResult { tools: build_tools() })
    }

    /// Handle tools/call request
    #[must_use]
    pub fn handle_tools_call(
        &self,
        id: RequestId,
        tool_name: &str,
        arguments: Value,
        scopes: &ScopeSet,
    ) -> JsonRpcResponse {
        match self.call(tool_name, arguments, scopes) {
            Ok(output) => {
                info!(tool = %tool_name, is_error = output.is_error(), "Tool call");
                JsonRpcResponse::success_from(id, &output.into_call_result())
            }
            Err(e) => {
                debug!(tool = %tool_name, error = %e, "Tool call rejected");
                JsonRpcResponse::from_error(Some(id), &e)
            }
        }
    }

    /// Run a tool and return its payload.
    ///
    /// Scope denials and missing todos are reported inside the payload as
    /// [`ToolOutput::Error`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonRpc`] with `-32602` for an unknown tool or
    /// arguments that do not match the tool's schema.
    pub fn call(&self, tool_name: &str, arguments: Value, scopes: &ScopeSet) -> Result<ToolOutput> {
        let Some(op) = Operation::from_tool_name(tool_name) else {
            return Err(Error::json_rpc(
                rpc_codes::INVALID_PARAMS,
                format!("Unknown tool: {tool_name}"),
            ));
        };

        let store = &self.store;
        let outcome = match op {
            Operation::Create => {
                let args: CreateArgs = parse_args(tool_name, arguments)?;
                store
                    .create(scopes, args.title, args.description)
                    .map(ToolOutput::Todo)
            }
            Operation::List => {
                let args: ListArgs = parse_args(tool_name, arguments)?;
                store.list(scopes, args.completed).map(ToolOutput::Todos)
            }
            Operation::Get => {
                let args: TodoIdArgs = parse_args(tool_name, arguments)?;
                store.get(scopes, &args.todo_id).map(ToolOutput::Todo)
            }
            Operation::Update => {
                let args: UpdateArgs = parse_args(tool_name, arguments)?;
                store
                    .update(scopes, &args.todo_id, args.patch)
                    .map(ToolOutput::Todo)
            }
            Operation::Delete => {
                let args: TodoIdArgs = parse_args(tool_name, arguments)?;
                store.delete(scopes, &args.todo_id).map(ToolOutput::Deleted)
            }
        };

        if let Err(ref e) = outcome {
            debug!(tool = %op, kind = e.kind(), "Todo operation refused");
        }
        Ok(outcome.into())
    }
}
