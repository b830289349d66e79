//! OAuth Protected Resource Metadata (RFC 9728)
//!
//! Served at `/.well-known/oauth-protected-resource` (and the `/mcp`
//! suffixed variant) so MCP clients can discover which authorization server
//! issues tokens for this resource.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::OAuthConfig;

/// Protected resource metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Protected resource identifier (the MCP endpoint URL)
    pub resource: String,

    /// Authorization servers that can issue tokens for this resource
    #[serde(default)]
    pub authorization_servers: Vec<String>,

    /// Supported bearer token methods
    #[serde(default)]
    pub bearer_methods_supported: Vec<String>,

    /// Supported scopes (may be string or array due to implementation bugs)
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scopes_supported: Vec<String>,

    /// Human-readable resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
}

/// Deserialize scopes that may be either a string or array
fn deserialize_scopes<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    match StringOrVec::deserialize(deserializer)? {
        StringOrVec::String(s) => Ok(s.split_whitespace().map(String::from).collect()),
        StringOrVec::Vec(v) => Ok(v),
    }
}

impl ProtectedResourceMetadata {
    /// Build the document advertised for this server.
    #[must_use]
    pub fn from_config(config: &OAuthConfig) -> Self {
        let authorization_servers = if config.is_configured() {
            vec![format!(
                "{}/resources/{}",
                config.issuer(),
                config.resource_id
            )]
        } else {
            Vec::new()
        };

        Self {
            resource: config.mcp_endpoint(),
            authorization_servers,
            bearer_methods_supported: vec!["header".to_string()],
            scopes_supported: config.scopes_supported.clone(),
            resource_name: Some(env!("CARGO_PKG_NAME").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn oauth() -> OAuthConfig {
        OAuthConfig {
            environment_url: "https://acme.scalekit.dev/".into(),
            client_id: "skc_1".into(),
            resource_id: "res_42".into(),
            mcp_url: "https://todo.example.com/".into(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn from_config_points_at_provider_resource() {
        let metadata = ProtectedResourceMetadata::from_config(&oauth());

        assert_eq!(metadata.resource, "https://todo.example.com/mcp");
        assert_eq!(
            metadata.authorization_servers,
            vec!["https://acme.scalekit.dev/resources/res_42".to_string()]
        );
        assert_eq!(metadata.bearer_methods_supported, vec!["header"]);
        assert_eq!(metadata.scopes_supported, vec!["todo:read", "todo:write"]);
    }

    #[test]
    fn unconfigured_provider_advertises_no_authorization_server() {
        let metadata = ProtectedResourceMetadata::from_config(&OAuthConfig::default());
        assert!(metadata.authorization_servers.is_empty());
    }

    #[test]
    fn scopes_accept_space_delimited_string() {
        let json = r#"{"resource":"https://x/mcp","scopes_supported":"todo:read todo:write"}"#;
        let metadata: ProtectedResourceMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.scopes_supported, vec!["todo:read", "todo:write"]);
    }
}
