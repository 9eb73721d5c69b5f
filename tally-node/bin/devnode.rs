// bin/devnode.rs - Tally development node
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tally_node::{DevRecovery, NodeConfig, TokenNode};

#[derive(Parser, Debug)]
#[command(name = "tally-devnode")]
#[command(about = "Tally development node - checkpointed governance token ledger", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(short, long)]
    db_path: Option<String>,

    /// RPC port (overrides config)
    #[arg(short, long)]
    rpc_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    // Load config, applying CLI overrides
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
        None => NodeConfig::default(),
    };
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    if let Some(rpc_port) = args.rpc_port {
        config.rpc_port = rpc_port;
    }
    config.log_level = args.log_level;

    // Validate config
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    // Log configuration
    tracing::info!("Starting Tally development node");
    tracing::info!("Configuration:");
    tracing::info!("  Database: {}", config.db_path);
    tracing::info!("  RPC port: {}", config.rpc_port);
    tracing::info!("  Token: {} ({})", config.token.name, config.token.symbol);
    tracing::info!("  Chain id: {}", config.token.chain_id);
    tracing::info!("  Feature mask: {:#06x}", config.features);
    tracing::info!("");

    // Create the node; the dev recovery scheme stands in for a real
    // signature backend on devnets
    let node = Arc::new(TokenNode::new(config, DevRecovery).await?);

    // Set up shutdown handler
    tokio::spawn(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Received shutdown signal - stopping");
                std::process::exit(0);
            }
            Err(err) => {
                tracing::error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    node.run().await
}
