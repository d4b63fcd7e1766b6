// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # gossipnet Node
//!
//! Entry point for the `gossipnet-node` binary. Parses CLI arguments,
//! initializes logging, and dispatches to a subcommand:
//!
//! - `simulate`: run a set of gossiping peers in-process, each with an
//!   HTTP endpoint
//! - `keygen`: generate a node keypair and print its peer id
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod simulation;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;

use gossipnet_protocol::crypto::keys::NodeKeypair;
use gossipnet_protocol::identity::PeerId;

use cli::{Commands, GossipnetCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = GossipnetCli::parse();
    logging::init_logging(logging::DEFAULT_DIRECTIVES, cli.log_format);

    match cli.command {
        Commands::Simulate(args) => {
            let report = simulation::run_simulation(&args, shutdown_signal()).await?;
            print!("{report}");
            Ok(())
        }
        Commands::Keygen(args) => keygen(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct KeygenOutput {
    peer_id: String,
    public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_file: Option<String>,
}

/// Generates a keypair, optionally writing the secret key to disk.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let keypair = NodeKeypair::generate();
    let public_key = keypair.public_key();
    let peer_id = PeerId::from_public_key(&public_key);

    if let Some(path) = &args.output {
        std::fs::write(path, hex::encode(keypair.secret_key_bytes()))
            .with_context(|| format!("failed to write secret key to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
        }

        tracing::info!(peer = %peer_id.short(), key_path = %path.display(), "secret key written");
    }

    let output = KeygenOutput {
        peer_id: peer_id.to_hex(),
        public_key: public_key.to_hex(),
        key_file: args.output.as_ref().map(|p| p.display().to_string()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Keypair generated.");
        println!("  Peer id    : {}", output.peer_id);
        println!("  Label      : {}", peer_id.short());
        println!("  Public key : {}", output.public_key);
        if let Some(file) = &output.key_file {
            println!("  Secret key : {}", file);
        }
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("gossipnet-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", gossipnet_protocol::config::PROTOCOL_VERSION);
    println!("wire version   {}", gossipnet_protocol::config::WIRE_PROTOCOL_VERSION);
    println!("signatures     {}", gossipnet_protocol::config::SIGNING_ALGORITHM);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed that branch never fires; the run still
/// ends on the other signal or when its runtime elapses.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {}", e);
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
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
