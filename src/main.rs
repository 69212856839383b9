// ABOUTME: Entry point for the berth CLI application.
// ABOUTME: Loads configuration, connects to the engine, and serves the HTTP API.

mod cli;

use berth::api;
use berth::config::{self, Config};
use berth::engine::BollardEngine;
use berth::error::Result;
use berth::gateway::Gateway;
use clap::Parser;
use cli::{Cli, Commands};
use serde_json::Value;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        if let Some(kind) = e.connect_kind() {
            tracing::error!(?kind, "{}", e);
        }
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins, then `--verbose`, then the configured level.
fn init_tracing(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;
    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            println!("Created {}", path.display());
            Ok(())
        }
        Commands::Serve { listen, endpoint } => {
            let mut config = load_config(cli.config.as_deref(), &cwd)?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if endpoint.is_some() {
                config.engine.endpoint = endpoint;
            }
            init_tracing(cli.verbose, &config.logging.level);
            serve(config).await
        }
        Commands::Check { endpoint } => {
            let mut config = load_config(cli.config.as_deref(), &cwd)?;
            if endpoint.is_some() {
                config.engine.endpoint = endpoint;
            }
            init_tracing(cli.verbose, &config.logging.level);
            check(config).await
        }
    }
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::discover_or_default(cwd),
    }
}

async fn connect(config: &Config) -> Result<BollardEngine> {
    let endpoint = config.endpoint()?;
    Ok(BollardEngine::connect(endpoint, config.engine.connect_timeout).await?)
}

async fn serve(config: Config) -> Result<()> {
    let settings = config.gateway_settings()?;
    let engine = connect(&config).await?;
    let gateway = Gateway::new(engine, settings);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!("listening on http://{}{}", config.listen, api::API_PREFIX);
    axum::serve(listener, api::router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn check(config: Config) -> Result<()> {
    let settings = config.gateway_settings()?;
    let engine = connect(&config).await?;
    println!("Engine: {}", engine.endpoint());
    let gateway = Gateway::new(engine, settings);
    let info = gateway.info().await?;
    for field in ["ServerVersion", "OperatingSystem", "Containers", "Images"] {
        match info.get(field) {
            Some(Value::String(s)) => println!("{}: {}", field, s),
            Some(other) if !other.is_null() => println!("{}: {}", field, other),
            _ => {}
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
