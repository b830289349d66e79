//! Todo MCP server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use super::auth::ResolvedAuthConfig;
use super::router::{AppState, create_router};
use super::tools::TodoTools;
use crate::config::Config;
use crate::oauth::ProtectedResourceMetadata;
use crate::todo::TodoStore;
use crate::{Error, Result};

/// Todo MCP server
pub struct TodoServer {
    /// Configuration
    config: Config,
    /// Shared todo store
    store: Arc<TodoStore>,
}

impl TodoServer {
    /// Create a new server with an empty store
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(TodoStore::new()),
        }
    }

    /// Build the shared application state from configuration
    #[must_use]
    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            tools: Arc::new(TodoTools::new(Arc::clone(&self.store))),
            auth_config: Arc::new(ResolvedAuthConfig::from_config(&self.config)),
            metadata: ProtectedResourceMetadata::from_config(&self.config.oauth),
            max_body_size: self.config.server.max_body_size,
            request_timeout: self.config.server.request_timeout,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = create_router(self.app_state());

        // Bind listener
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("TODO MCP SERVER v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(
            "  POST http://{}:{}/mcp  (JSON-RPC)",
            self.config.server.host, self.config.server.port
        );

        if self.config.auth.enabled {
            let key_count = self.config.auth.api_keys.len();
            let jwt = self.config.oauth.is_configured();
            info!("AUTHENTICATION enabled (jwt={}, api_keys={})", jwt, key_count);
            if jwt {
                info!(issuer = %self.config.oauth.issuer(), audience = %self.config.oauth.resource_id, "Validating provider tokens");
                info!(metadata = %self.config.oauth.resource_metadata_url(), "Protected resource metadata");
            }
        } else {
            warn!(
                scopes = ?self.config.auth.anonymous_scopes,
                "AUTHENTICATION disabled - every request runs with the anonymous scopes"
            );
        }
        info!("============================================================");

        // Run server; on signal, stop accepting and drain for up to shutdown_timeout
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        });
        let mut handle = tokio::spawn(async move { server.await });

        tokio::select! {
            joined = &mut handle => return flatten_join(joined),
            () = shutdown_signal() => {}
        }

        let _ = shutdown_tx.send(());
        let drained = tokio::time::timeout(self.config.server.shutdown_timeout, &mut handle).await;
        match drained {
            Ok(joined) => flatten_join(joined)?,
            Err(_) => {
                warn!(
                    timeout = ?self.config.server.shutdown_timeout,
                    "Graceful shutdown timed out, dropping open connections"
                );
                handle.abort();
            }
        }

        info!(todos = self.store.len(), "Server stopped; in-memory todos discarded");
        Ok(())
    }
}

/// Collapse the server task's join result into a crate result.
fn flatten_join(
    joined: std::result::Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(served) => served.map_err(Error::from),
        Err(e) => Err(Error::Internal(format!("Server task failed: {e}"))),
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
