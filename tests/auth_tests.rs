//! End-to-end authentication tests
//!
//! Tests the full auth flow including:
//! - JWT access tokens (signed locally, verified with a static key)
//! - Scope extraction feeding the tool scope gate
//! - API key resolution from configuration

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use todo_mcp::config::{ApiKeyConfig, Config};
use todo_mcp::oauth::{JwtVerifier, KeySource, ProtectedResourceMetadata, TokenVerifier};
use todo_mcp::server::{AppState, ResolvedAuthConfig, TodoTools, create_router};
use todo_mcp::todo::TodoStore;

const SECRET: &[u8] = b"integration-test-secret-0123456789";
const ISSUER: &str = "https://acme.scalekit.dev";
const AUDIENCE: &str = "res_todo";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn static_verifier() -> JwtVerifier {
    JwtVerifier::new(
        ISSUER,
        AUDIENCE,
        KeySource::Static {
            key: DecodingKey::from_secret(SECRET),
            algorithm: Algorithm::HS256,
        },
    )
}

fn token(scope: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "iss": ISSUER,
            "aud": [AUDIENCE],
            "sub": "user_42",
            "exp": now() + 300,
            "scope": scope
        }),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

fn config() -> Config {
    let mut config = Config::default();
    config.env_files.clear();
    config.oauth.environment_url = ISSUER.into();
    config.oauth.resource_id = AUDIENCE.into();
    config.oauth.mcp_url = "https://todo.example.com".into();
    config
}

fn app() -> Router {
    let config = config();
    let auth = ResolvedAuthConfig::from_config(&config).with_verifier(Arc::new(static_verifier()));
    create_router(Arc::new(AppState {
        tools: Arc::new(TodoTools::new(Arc::new(TodoStore::new()))),
        auth_config: Arc::new(auth),
        metadata: ProtectedResourceMetadata::from_config(&config.oauth),
        max_body_size: config.server.max_body_size,
        request_timeout: config.server.request_timeout,
    }))
}

async fn call(app: &Router, bearer: &str, name: &str, arguments: Value) -> (StatusCode, Value) {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let request = Request::post("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn jwt_with_write_scope_can_create() {
    let app = app();
    let (status, body) = call(
        &app,
        &token("todo:read todo:write"),
        "create_todo",
        json!({"title": "Ship it"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(body["result"]["structuredContent"]["todo"]["title"], "Ship it");
}

#[tokio::test]
async fn jwt_with_read_scope_only_is_denied_writes() {
    let app = app();
    let (status, body) = call(
        &app,
        &token("todo:read"),
        "create_todo",
        json!({"title": "nope"}),
    )
    .await;
    // Authenticated, so HTTP 200; the denial is a tool-level error
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(
        body["result"]["structuredContent"]["error"],
        "Insufficient permissions: `todo:write` scope required."
    );
}

#[tokio::test]
async fn jwt_with_write_scope_only_is_denied_reads() {
    let (_, body) = call(&app(), &token("todo:write"), "list_todos", json!({})).await;
    assert_eq!(
        body["result"]["structuredContent"]["error"],
        "Insufficient permissions: `todo:read` scope required."
    );
}

#[tokio::test]
async fn expired_jwt_is_unauthorized() {
    let expired = encode(
        &Header::new(Algorithm::HS256),
        &json!({"iss": ISSUER, "aud": AUDIENCE, "exp": now() - 3600, "scope": "todo:read"}),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let (status, body) = call(&app(), &expired, "list_todos", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn jwt_not_yet_valid_is_unauthorized() {
    let early = encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": now() + 7200,
            "nbf": now() + 3600,
            "scope": "todo:read todo:write"
        }),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let (status, body) = call(&app(), &early, "list_todos", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn jwt_for_another_audience_is_unauthorized() {
    let foreign = encode(
        &Header::new(Algorithm::HS256),
        &json!({"iss": ISSUER, "aud": "res_other", "exp": now() + 300, "scope": "todo:read"}),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let (status, _) = call(&app(), &foreign, "list_todos", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verifier_reads_scp_array_claim() {
    let token = encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": now() + 300,
            "scp": ["todo:read", "todo:write"]
        }),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let access = static_verifier().verify(&token).await.unwrap();
    assert_eq!(access.scopes.sorted(), vec!["todo:read", "todo:write"]);
}

#[test]
fn api_keys_resolve_env_indirection() {
    let path = std::env::var("PATH").unwrap();

    let mut config = config();
    config.auth.api_keys = vec![
        ApiKeyConfig {
            key: "env:PATH".into(),
            name: "ci".into(),
            scopes: vec!["todo:read".into()],
        },
        ApiKeyConfig {
            key: "env:TODO_MCP_TEST_UNSET_VARIABLE".into(),
            name: "unset".into(),
            scopes: vec!["todo:write".into()],
        },
    ];

    let auth = ResolvedAuthConfig::from_config(&config);
    let access = auth.match_api_key(&path).unwrap();
    assert_eq!(access.display_name(), "ci");
    assert!(access.scopes.contains("todo:read"));

    // An unresolvable key is dropped, never matched literally
    assert_eq!(auth.api_keys.len(), 1);
    assert!(auth.match_api_key("env:TODO_MCP_TEST_UNSET_VARIABLE").is_none());
}
