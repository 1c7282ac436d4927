//! # Drumbeat — Durable Session Task Engine
//!
//! Runs recurring send loops for many accounts from one process, with a
//! JSON recovery ledger that survives restarts.
//!
//! Usage:
//!   drumbeat                          # Start with defaults (port 2007)
//!   drumbeat --port 8080              # Custom gateway port
//!   drumbeat --bridge-url http://...  # Point at a different bridge sidecar

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use drumbeat_core::config::DrumbeatConfig;
use drumbeat_engine::SessionEngine;
use drumbeat_transport::BridgeMessenger;

#[derive(Parser)]
#[command(
    name = "drumbeat",
    version,
    about = "🥁 Drumbeat — durable session task engine"
)]
struct Cli {
    /// Path to config file (default: ~/.drumbeat/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Gateway bind host
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// Data directory for the ledger and device profile
    #[arg(long)]
    data_dir: Option<String>,

    /// Bridge sidecar base URL
    #[arg(long)]
    bridge_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "drumbeat=debug,drumbeat_engine=debug,drumbeat_transport=debug,drumbeat_gateway=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => DrumbeatConfig::load_from(std::path::Path::new(path))?,
        None => DrumbeatConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(bridge_url) = cli.bridge_url {
        config.bridge.base_url = bridge_url;
    }
    config.storage.data_dir = shellexpand::tilde(&config.storage.data_dir).to_string();

    println!("🥁 Drumbeat v{}", env!("CARGO_PKG_VERSION"));
    println!("   📂 Data Dir: {}", config.storage.data_dir);
    println!("   🌉 Bridge:   {}", config.bridge.base_url);
    println!(
        "   🌐 Gateway:  http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!();

    let messenger = Arc::new(BridgeMessenger::new(&config.bridge)?);
    let engine = Arc::new(SessionEngine::new(&config.storage, messenger));

    // Replay the recovery ledger in the background while the gateway binds
    tracing::info!("🚀 Engine ready, replaying recovery ledger in background");
    tokio::spawn(drumbeat_engine::resume_all(Arc::clone(&engine)));

    drumbeat_gateway::start(&config, engine).await?;
    Ok(())
}
