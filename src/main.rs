//! Todo MCP server - scope-gated todo CRUD tools over Streamable HTTP

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use todo_mcp::{
    cli::{Cli, Command},
    config::Config,
    server::TodoServer,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::CheckConfig) => run_check_config(&config),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load configuration, apply CLI overrides and validate
fn load_config(cli: &Cli) -> todo_mcp::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Print a summary of the validated configuration (no secrets)
fn run_check_config(config: &Config) -> ExitCode {
    println!("Configuration OK");
    println!("  listen:        {}:{}", config.server.host, config.server.port);
    println!("  auth:          {}", if config.auth.enabled { "enabled" } else { "disabled" });
    println!("  api keys:      {}", config.auth.api_keys.len());
    if config.oauth.is_configured() {
        println!("  issuer:        {}", config.oauth.issuer());
        println!("  audience:      {}", config.oauth.resource_id);
        println!("  jwks:          {}", config.oauth.jwks_uri());
        println!("  mcp endpoint:  {}", config.oauth.mcp_endpoint());
    } else {
        println!("  jwt:           disabled (no oauth.environment_url)");
    }
    ExitCode::SUCCESS
}

/// Run the MCP server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        auth = config.auth.enabled,
        "Starting todo MCP server"
    );

    if let Err(e) = TodoServer::new(config).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}
