//! HTTP router and handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::debug;

use super::auth::{ResolvedAuthConfig, auth_middleware};
use super::tools::TodoTools;
use crate::error::rpc_codes;
use crate::oauth::{AccessToken, ProtectedResourceMetadata};
use crate::protocol::{JsonRpcResponse, RequestId, ToolsCallParams};

/// Shared application state
pub struct AppState {
    /// Tool handler (owns the shared store)
    pub tools: Arc<TodoTools>,
    /// Authentication configuration
    pub auth_config: Arc<ResolvedAuthConfig>,
    /// Protected resource metadata served under `/.well-known/`
    pub metadata: ProtectedResourceMetadata,
    /// Maximum accepted request body in bytes
    pub max_body_size: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_config = Arc::clone(&state.auth_config);
    let max_body_size = state.max_body_size;
    let request_timeout = state.request_timeout;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::WWW_AUTHENTICATE]);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/.well-known/oauth-protected-resource",
            get(resource_metadata_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource/mcp",
            get(resource_metadata_handler),
        )
        .route(
            "/mcp",
            post(mcp_handler)
                .get(method_not_allowed_handler)
                .delete(method_not_allowed_handler),
        )
        // Authentication middleware (applied before other layers)
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(timeout_layer(request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Requests running past `timeout` are answered with `408 Request Timeout`.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "todos": state.tools.store().len()
    }))
}

/// RFC 9728 protected resource metadata
async fn resource_metadata_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metadata.clone())
}

/// GET/DELETE /mcp handler - this server keeps no sessions and opens no streams
async fn method_not_allowed_handler() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": rpc_codes::INVALID_REQUEST,
                "message": "Stateless server: use POST to send JSON-RPC requests to /mcp"
            },
            "id": null
        })),
    )
}

/// Render a JSON-RPC response with the given status.
fn rpc_response(status: StatusCode, response: &JsonRpcResponse) -> Response {
    (
        status,
        Json(serde_json::to_value(response).unwrap_or_default()),
    )
        .into_response()
}

/// MCP handler (POST /mcp)
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    http_request: Request<Body>,
) -> Response {
    // Set by the auth middleware; absent only on misconfigured public paths
    let scopes = http_request
        .extensions()
        .get::<AccessToken>()
        .map(|t| t.scopes.clone())
        .unwrap_or_default();

    let body_bytes: Bytes =
        match axum::body::to_bytes(http_request.into_body(), state.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let response = JsonRpcResponse::error(
                    None,
                    rpc_codes::PARSE_ERROR,
                    format!("Failed to read body: {e}"),
                );
                return rpc_response(StatusCode::BAD_REQUEST, &response);
            }
        };

    let request: Value = match serde_json::from_slice(&body_bytes) {
        Ok(v) => v,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, rpc_codes::PARSE_ERROR, format!("Invalid JSON: {e}"));
            return rpc_response(StatusCode::BAD_REQUEST, &response);
        }
    };

    let (id, method, params) = match parse_request(&request) {
        Ok(parsed) => parsed,
        Err(response) => return rpc_response(StatusCode::BAD_REQUEST, &response),
    };

    debug!(method = %method, "MCP request");

    // Handle notifications - return 202 Accepted with empty body
    if is_notification_method(&method) {
        debug!(notification = %method, "Handling notification");
        return StatusCode::ACCEPTED.into_response();
    }

    // parse_request guarantees an id for anything that is not a notification
    let Some(id) = id else {
        let response = JsonRpcResponse::error(None, rpc_codes::INVALID_REQUEST, "Missing id");
        return rpc_response(StatusCode::BAD_REQUEST, &response);
    };

    let response = match method.as_str() {
        "initialize" => TodoTools::handle_initialize(id, params.as_ref()),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => TodoTools::handle_tools_list(id),
        "tools/call" => {
            let call = extract_tools_call_params(params);
            state
                .tools
                .handle_tools_call(id, &call.name, call.arguments, &scopes)
        }
        _ => JsonRpcResponse::error(
            Some(id),
            rpc_codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        ),
    };

    rpc_response(StatusCode::OK, &response)
}

/// Extract a JSON-RPC id (string or integer).
fn extract_request_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(s) => Some(RequestId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

/// Check whether a method name represents a notification (no response expected).
fn is_notification_method(method: &str) -> bool {
    method.starts_with("notifications/")
}

/// Extract the `tools/call` parameters (tool name and arguments) from request params.
///
/// Malformed params yield an empty name, which the tool handler rejects as
/// an unknown tool; missing arguments stay `null` and are treated as `{}`.
fn extract_tools_call_params(params: Option<Value>) -> ToolsCallParams {
    params
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default()
}

/// Parse JSON-RPC request or notification
/// Returns (Option<RequestId>, method, params) - id is None for notifications
#[allow(clippy::result_large_err)] // JsonRpcResponse used directly as HTTP error body
fn parse_request(
    value: &Value,
) -> Result<(Option<RequestId>, String, Option<Value>), JsonRpcResponse> {
    // Check jsonrpc version
    let jsonrpc = value.get("jsonrpc").and_then(|v| v.as_str());
    if jsonrpc != Some("2.0") {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        ));
    }

    // Get ID (required for requests, missing for notifications)
    let id = value.get("id").and_then(extract_request_id);

    // Get method
    let method = value
        .get("method")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            JsonRpcResponse::error(id.clone(), rpc_codes::INVALID_REQUEST, "Missing method")
        })?;

    // Get params (optional)
    let params = value.get("params").cloned();

    if !is_notification_method(method) && id.is_none() {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Missing id",
        ));
    }

    Ok((id, method.to_string(), params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_request_gets_request_timeout() {
        let app: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(timeout_layer(Duration::from_millis(20)));

        let request = Request::get("/slow").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    // =====================================================================
    // extract_request_id
    // =====================================================================

    #[test]
    fn extract_request_id_string_value() {
        let id = extract_request_id(&json!("abc-123")).unwrap();
        assert_eq!(id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn extract_request_id_integers() {
        assert_eq!(extract_request_id(&json!(42)), Some(RequestId::Number(42)));
        assert_eq!(extract_request_id(&json!(-1)), Some(RequestId::Number(-1)));
        assert_eq!(extract_request_id(&json!(0)), Some(RequestId::Number(0)));
    }

    #[test]
    fn extract_request_id_rejects_other_types() {
        assert!(extract_request_id(&json!(null)).is_none());
        assert!(extract_request_id(&json!(true)).is_none());
        assert!(extract_request_id(&json!(2.5)).is_none());
        assert!(extract_request_id(&json!([1, 2])).is_none());
        assert!(extract_request_id(&json!({"id": 1})).is_none());
    }

    // =====================================================================
    // is_notification_method
    // =====================================================================

    #[test]
    fn notification_method_recognized() {
        assert!(is_notification_method("notifications/initialized"));
        assert!(is_notification_method("notifications/cancelled"));
    }

    #[test]
    fn regular_method_not_notification() {
        assert!(!is_notification_method("initialize"));
        assert!(!is_notification_method("tools/call"));
        assert!(!is_notification_method("notification/typo"));
    }

    // =====================================================================
    // extract_tools_call_params
    // =====================================================================

    #[test]
    fn extract_tools_call_params_reads_name_and_arguments() {
        let params = json!({"name": "get_todo", "arguments": {"todo_id": "x"}});
        let call = extract_tools_call_params(Some(params));
        assert_eq!(call.name, "get_todo");
        assert_eq!(call.arguments, json!({"todo_id": "x"}));
    }

    #[test]
    fn extract_tools_call_params_defaults_when_absent() {
        let call = extract_tools_call_params(None);
        assert_eq!(call.name, "");
        assert_eq!(call.arguments, Value::Null);

        let call = extract_tools_call_params(Some(json!({"name": 42})));
        assert_eq!(call.name, "");
    }

    // =====================================================================
    // parse_request
    // =====================================================================

    #[test]
    fn parse_request_valid_request() {
        let req = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
        let (id, method, params) = parse_request(&req).unwrap();
        assert_eq!(id, Some(RequestId::Number(1)));
        assert_eq!(method, "tools/list");
        assert!(params.is_none());
    }

    #[test]
    fn parse_request_notification_without_id() {
        let req = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let (id, method, _) = parse_request(&req).unwrap();
        assert!(id.is_none());
        assert_eq!(method, "notifications/initialized");
    }

    #[test]
    fn parse_request_rejects_wrong_version() {
        let req = json!({"jsonrpc": "1.0", "id": 1, "method": "ping"});
        let err = parse_request(&req).unwrap_err();
        assert_eq!(err.error.unwrap().code, rpc_codes::INVALID_REQUEST);
    }

    #[test]
    fn parse_request_rejects_missing_method() {
        let req = json!({"jsonrpc": "2.0", "id": 7});
        let err = parse_request(&req).unwrap_err();
        assert_eq!(err.id, Some(RequestId::Number(7)));
        assert_eq!(err.error.unwrap().message, "Missing method");
    }

    #[test]
    fn parse_request_rejects_request_without_id() {
        let req = json!({"jsonrpc": "2.0", "method": "tools/list"});
        let err = parse_request(&req).unwrap_err();
        assert_eq!(err.error.unwrap().message, "Missing id");
    }
}
