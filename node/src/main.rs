// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Badge Node
//!
//! Entry point for the `badge-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the minting API.
//!
//! The binary supports four subcommands:
//!
//! - `serve`   — start the HTTP API against the devnet ledger
//! - `keygen`  — generate a custodial signing key
//! - `inspect` — print the policy id and holder address of a bundle
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use badge_protocol::address::script_address;
use badge_protocol::blueprint::{BadgeScripts, Blueprint};
use badge_protocol::codec::{KeyHash, Unit};
use badge_protocol::crypto::CustodialKey;
use badge_protocol::ledger::Emulator;
use badge_protocol::{BadgeConfig, BadgeContext, Network};

use cli::{BadgeNodeCli, Commands};
use metrics::BadgeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BadgeNodeCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Inspect(args) => inspect(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    logging::init_logging(args.log_format);

    let mut config = BadgeConfig::from_env().context("invalid badge configuration")?;
    if let Some(path) = args.blueprint {
        config.blueprint_path = path;
    }
    let key = config
        .custodial_key()
        .context("BADGE_SIGNING_KEY is not a usable signing key")?;

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        network = %config.network,
        blueprint = %config.blueprint_path.display(),
        owner = %key.key_hash(),
        "starting badge-node"
    );

    // --- Ledger ---
    let ledger = Arc::new(Emulator::new(config.network, key));

    // --- Context ---
    let ctx = BadgeContext::new(config, ledger).context("failed to create badge context")?;

    // --- Metrics ---
    let badge_metrics = Arc::new(BadgeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ctx: Arc::new(ctx),
        metrics: Arc::clone(&badge_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&badge_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("badge-node stopped");
    Ok(())
}

/// Generates a custodial key and prints it with its owner key hash.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let key = CustodialKey::generate();
    let bech32 = key.to_bech32().context("failed to encode key as bech32")?;

    if args.bech32 {
        println!("{}", bech32);
        return Ok(());
    }

    println!("Signing key (hex)    : {}", key.to_hex());
    println!("Signing key (bech32) : {}", bech32);
    println!("Owner key hash       : {}", key.key_hash());
    println!();
    println!("Export one of the key forms as BADGE_SIGNING_KEY.");
    Ok(())
}

/// Loads a contract bundle and prints what the node would derive from it.
async fn inspect(args: cli::InspectArgs) -> Result<()> {
    let network: Network = args.network.parse().context("invalid --network")?;
    let blueprint = Blueprint::load(&args.blueprint)
        .await
        .with_context(|| format!("failed to load {}", args.blueprint.display()))?;
    let scripts = BadgeScripts::resolve(&blueprint, &args.policy_title, &args.holder_title)
        .context("bundle is missing a badge validator")?;
    let holder_address = script_address(&scripts.holder_hash(), network)?;

    println!("Bundle         : {}", blueprint.preamble.title);
    println!("Policy id      : {}", scripts.policy_id());
    println!("Holder hash    : {}", scripts.holder_hash());
    println!("Holder address : {}", holder_address);

    if let (Some(owner), Some(level)) = (args.owner.as_deref(), args.level) {
        let owner = KeyHash::from_hex(owner, "--owner")?;
        let unit = Unit::badge(scripts.policy_id(), &owner, level)?;
        println!("Asset name     : {}", unit.asset_name);
        println!("Unit           : {}", unit);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("badge-node {}", env!("CARGO_PKG_VERSION"));
    println!("plutus     {}", badge_protocol::config::PLUTUS_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
