//! Configuration management
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. YAML file (`--config`)
//! 2. `TODO_MCP_`-prefixed environment variables, `__` separating sections
//!    (`TODO_MCP_SERVER__PORT=3002`)
//! 3. Plain provider variables: `SCALEKIT_ENVIRONMENT_URL`, `SCALEKIT_CLIENT_ID`,
//!    `SCALEKIT_RESOURCE_ID`, `MCP_URL`, `PORT`
//!
//! `.env` files listed in `env_files` are loaded into the process environment
//! before the environment providers are read.

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
    value::{Uncased, UncasedStr},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::todo::{READ_SCOPE, WRITE_SCOPE};
use crate::{Error, Result};

/// Plain environment variables and the config keys they map onto.
const PROVIDER_ENV_KEYS: &[(&str, &str)] = &[
    ("SCALEKIT_ENVIRONMENT_URL", "oauth.environment_url"),
    ("SCALEKIT_CLIENT_ID", "oauth.client_id"),
    ("SCALEKIT_RESOURCE_ID", "oauth.resource_id"),
    ("MCP_URL", "oauth.mcp_url"),
    ("PORT", "server.port"),
];

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before reading environment variables.
    /// Missing files are skipped.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// OAuth provider configuration
    pub oauth: OAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_files: vec![".env".to_string()],
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3002,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a bearer token on non-public paths
    pub enabled: bool,

    /// Static API keys, checked before JWT verification
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,

    /// Path prefixes that bypass authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    /// Scopes granted to every request when auth is disabled
    #[serde(default)]
    pub anonymous_scopes: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/.well-known/".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: Vec::new(),
            public_paths: default_public_paths(),
            anonymous_scopes: Vec::new(),
        }
    }
}

/// Static API key with the scopes it grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    /// The API key value (supports `env:VAR_NAME`)
    pub key: String,

    /// Human-readable name for this client
    #[serde(default)]
    pub name: String,

    /// Scopes granted to this key
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ApiKeyConfig {
    /// Resolve the API key (expand env vars)
    #[must_use]
    pub fn resolve_key(&self) -> String {
        if let Some(var_name) = self.key.strip_prefix("env:") {
            env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!(key = %self.name, var = %var_name, "API key variable not set, key disabled");
                String::new()
            })
        } else {
            self.key.clone()
        }
    }
}

/// OAuth provider configuration.
///
/// The provider issues tokens; this server only validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Provider environment URL, also the expected token issuer
    pub environment_url: String,
    /// OAuth client identifier registered for this server
    pub client_id: String,
    /// Resource identifier, the expected token audience
    pub resource_id: String,
    /// Externally reachable base URL of this server (with trailing slash)
    pub mcp_url: String,
    /// JWKS endpoint override (default: `<environment_url>/keys`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    /// Scopes advertised in protected-resource metadata
    pub scopes_supported: Vec<String>,
    /// How long a fetched JWKS is reused
    #[serde(with = "humantime_serde")]
    pub jwks_cache_ttl: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            environment_url: String::new(),
            client_id: String::new(),
            resource_id: String::new(),
            mcp_url: String::new(),
            jwks_uri: None,
            scopes_supported: vec![READ_SCOPE.to_string(), WRITE_SCOPE.to_string()],
            jwks_cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl OAuthConfig {
    /// Whether JWT verification against the provider is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.environment_url.is_empty()
    }

    /// JWKS endpoint to fetch signing keys from
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        self.jwks_uri.clone().unwrap_or_else(|| {
            format!("{}/keys", self.environment_url.trim_end_matches('/'))
        })
    }

    /// Issuer expected in the `iss` claim
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.environment_url.trim_end_matches('/')
    }

    /// URL clients use for the MCP endpoint
    #[must_use]
    pub fn mcp_endpoint(&self) -> String {
        format!("{}/mcp", self.mcp_url.trim_end_matches('/'))
    }

    /// URL of this server's protected-resource metadata document
    #[must_use]
    pub fn resource_metadata_url(&self) -> String {
        format!(
            "{}/.well-known/oauth-protected-resource/mcp",
            self.mcp_url.trim_end_matches('/')
        )
    }
}

impl Config {
    /// Build the layered configuration: defaults, YAML, then environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `path` is missing or any layer fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Figment::from(Serialized::defaults(Self::default()));
        let mut figment = match path {
            Some(file) if file.exists() => defaults.merge(Yaml::file(file)),
            Some(file) => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    file.display()
                )));
            }
            None => defaults,
        };

        // env_files must be known before the environment is read
        let env_files: Vec<String> = figment
            .extract_inner("env_files")
            .map_err(|e| Error::Config(e.to_string()))?;
        load_env_files(&env_files);

        figment = figment
            .merge(Env::prefixed("TODO_MCP_").split("__"))
            .merge(
                Env::raw()
                    .only(&PROVIDER_ENV_KEYS.iter().map(|(k, _)| *k).collect::<Vec<_>>())
                    .map(provider_env_key),
            );

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Check that the loaded values can actually serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".into()));
        }

        if !self.auth.enabled {
            return Ok(());
        }

        if !self.oauth.is_configured() {
            if self.auth.api_keys.is_empty() {
                return Err(Error::Config(
                    "auth is enabled but neither oauth.environment_url nor auth.api_keys is set"
                        .into(),
                ));
            }
            return Ok(());
        }

        parse_url("oauth.environment_url", &self.oauth.environment_url)?;
        if let Some(ref jwks) = self.oauth.jwks_uri {
            parse_url("oauth.jwks_uri", jwks)?;
        }
        if self.oauth.resource_id.is_empty() {
            return Err(Error::Config(
                "oauth.resource_id is required when oauth.environment_url is set".into(),
            ));
        }
        if self.oauth.mcp_url.is_empty() {
            return Err(Error::Config(
                "oauth.mcp_url is required when oauth.environment_url is set".into(),
            ));
        }
        parse_url("oauth.mcp_url", &self.oauth.mcp_url)?;

        Ok(())
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Config(format!("{field} is not a valid URL ({value}): {e}")))
}

/// Map a plain provider variable onto its config key.
fn provider_env_key(key: &UncasedStr) -> Uncased<'_> {
    PROVIDER_ENV_KEYS
        .iter()
        .find(|(name, _)| key == *name)
        .map_or_else(
            || Uncased::from_borrowed(key.as_str()),
            |(_, path)| Uncased::from_borrowed(path),
        )
}

/// Load environment files into the process environment.
fn load_env_files(paths: &[String]) {
    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(()) => tracing::info!("Loaded env file: {path_str}"),
                Err(e) => tracing::warn!("Failed to load env file {path_str}: {e}"),
            }
        } else {
            tracing::debug!("Env file not found (skipped): {path_str}");
        }
    }
}
