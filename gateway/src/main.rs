//! Tiergate entitlement gateway.
//!
//! This binary fronts the browser extension's entitlement API:
//! 1. Resolves subscription tier across the migration-era data sources
//! 2. Gates limited users behind the per-device daily quota ledger
//! 3. Issues signed session credentials
//!
//! Usage:
//!   tiergate-gateway --port 8080
//!
//! The gateway keeps all documents in process memory; state does not
//! survive a restart.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tiergate_gateway::{build_router, AppState};
use tiergate_session::CredentialSigner;
use tiergate_store::MemoryStore;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tiergate-gateway")]
#[command(about = "Entitlement and daily-quota gateway for the extension API")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the credential signing seed file
    #[arg(short, long, default_value = "gateway-signing.key")]
    key: PathBuf,

    /// Origin used for absolute URLs in responses
    #[arg(long, default_value = "http://localhost:8080")]
    public_origin: String,

    /// Mount the per-source diagnostics route
    #[arg(long)]
    enable_diagnostics: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Tiergate gateway starting...");
    let signer = load_or_generate_signer(&args.key)?;
    info!(
        "Credential verifying key: {}",
        hex_lower(&signer.verifying_key_bytes())
    );

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store, signer, args.public_origin.clone());
    let app = build_router(state, args.enable_diagnostics);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .context("Failed to bind API port")?;

    println!("\n========================================");
    println!("  Tiergate Gateway Running");
    println!("========================================");
    println!("  Port:        {}", args.port);
    println!("  Origin:      {}", args.public_origin);
    println!("  Diagnostics: {}", args.enable_diagnostics);
    println!("========================================\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;
    info!("Tiergate gateway stopped");
    Ok(())
}

fn load_or_generate_signer(path: &PathBuf) -> Result<CredentialSigner> {
    if path.exists() {
        info!("Loading signing seed from {:?}", path);
        let seed = fs::read(path).context("Failed to read signing seed file")?;
        Ok(CredentialSigner::from_seed(&seed))
    } else {
        info!("Generating new signing seed at {:?}", path);
        let mut seed = Vec::with_capacity(32);
        seed.extend_from_slice(Uuid::new_v4().as_bytes());
        seed.extend_from_slice(Uuid::new_v4().as_bytes());
        fs::write(path, &seed).context("Failed to write signing seed file")?;
        Ok(CredentialSigner::from_seed(&seed))
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
    }
}
