// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PORTER Relay Operator
//!
//! Entry point for the `porter-relayer` binary. Parses CLI arguments,
//! initializes logging, and drives the relay pipeline.
//!
//! The binary supports three subcommands:
//!
//! - `demo`    — run the full gasless lifecycle against an in-process
//!   dev ledger: mint, transfer, and a replay rejection
//! - `keygen`  — generate a signer keypair and write the key file
//! - `version` — print build version information

mod cli;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use ethers::types::{Address, U256};
use porter_contracts::gasless_nft::{self, mint_call, transfer_call, GaslessNft};
use porter_protocol::crypto::{keccak256, PorterKeypair};
use porter_protocol::forward::{RequestBuilder, SignedForwardRequest};
use porter_protocol::ledger::DevLedger;
use porter_protocol::receipt::ReceiptClassifier;
use porter_protocol::relay::{RelayError, Relayer};

use cli::{Commands, PorterRelayerCli};
use config::RelayerConfig;
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PorterRelayerCli::parse();

    match cli.command {
        Commands::Demo(args) => run_demo(args).await,
        Commands::Keygen(args) => generate_key(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs the complete relay lifecycle in-process: a signer who never pays
/// for gas mints an NFT, transfers it, and then watches the protocol
/// refuse a replay of the spent mint. Receipts go to stdout as JSON;
/// narration goes to stderr via tracing.
async fn run_demo(args: cli::DemoArgs) -> Result<()> {
    logging::init_logging(
        "porter_relayer=info,porter_protocol=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let config = RelayerConfig::load_or_default(args.config.as_deref())?;
    if let Some(endpoint) = &config.ledger.endpoint {
        // TODO: wire a JSON-RPC ledger client once a chain endpoint is
        // part of the deployment story.
        tracing::warn!(
            %endpoint,
            "remote ledger endpoints are not wired up; using the in-process dev ledger"
        );
    }

    // --- Signing domain ---
    let mut domain = config.signing_domain();
    if domain.verifying_contract == Address::zero() {
        domain.verifying_contract = derived_address(b"porter/demo/forwarder");
    }
    tracing::info!(domain = %domain, "signing domain");

    // --- Ledger and target ---
    let ledger = Arc::new(DevLedger::new(domain.clone()));
    let nft_address = derived_address(b"porter/demo/gasless-nft");
    let nft = Arc::new(GaslessNft::new());
    ledger.register_target(nft_address, nft.clone());
    tracing::info!(address = %nft_address, "gasless NFT mounted");

    // --- Relayer and builder ---
    let mut emitters = config.classifier()?.emitters().to_vec();
    emitters.push(gasless_nft::known_emitter("GaslessNFT", nft_address));
    let relayer = Relayer::new(
        domain.clone(),
        ledger.clone(),
        ReceiptClassifier::new(emitters),
    );
    let builder = RequestBuilder::new(domain, ledger.clone())
        .with_gas_ceiling(U256::from(config.gas.default_ceiling));

    // --- Demo signers ---
    let holder = PorterKeypair::generate();
    let friend = PorterKeypair::generate();
    tracing::info!(
        holder = %holder.address_checksum(),
        friend = %friend.address_checksum(),
        "demo signers generated"
    );

    // --- 1. Gasless mint ---
    let prepared = builder
        .build(holder.address(), mint_call(nft_address, holder.address()))
        .await?;
    let signature = holder.sign_digest(prepared.signing_payload)?;
    let signed_mint = SignedForwardRequest::new(prepared.request, &signature);

    let mint_receipt = relayer.relay(&signed_mint).await?;
    println!("{}", serde_json::to_string_pretty(&mint_receipt)?);

    let token_id = decode_minted_id(mint_receipt.result.return_data.as_ref());
    tracing::info!(token_id = %token_id, "mint landed");

    // --- 2. Gasless transfer ---
    let prepared = builder
        .build(
            holder.address(),
            transfer_call(nft_address, holder.address(), friend.address(), token_id),
        )
        .await?;
    let signature = holder.sign_digest(prepared.signing_payload)?;
    let signed_transfer = SignedForwardRequest::new(prepared.request, &signature);

    let transfer_receipt = relayer.relay(&signed_transfer).await?;
    println!("{}", serde_json::to_string_pretty(&transfer_receipt)?);

    // --- 3. Replay the spent mint ---
    match relayer.relay(&signed_mint).await {
        Err(RelayError::NonceReused { expected, got, .. }) => {
            tracing::info!(%expected, %got, "replay correctly rejected");
        }
        Err(other) => anyhow::bail!("replay rejected for the wrong reason: {other}"),
        Ok(_) => anyhow::bail!("replay was accepted; that is a protocol violation"),
    }

    // --- Final state ---
    let owner = nft.owner_of(token_id).unwrap_or_default();
    let nonce = relayer.get_nonce(holder.address()).await?;
    if let Some(record) = relayer.execution_status(mint_receipt.execution_id).await? {
        tracing::info!(
            execution_id = %record.execution_id,
            status = %record.status,
            gas_used = %record.result.gas_used,
            "mint execution record"
        );
    }
    tracing::info!(owner = %owner, holder_nonce = %nonce, "demo complete");

    Ok(())
}

/// Generates a signer keypair and writes the hex-encoded secret to disk.
fn generate_key(args: cli::KeygenArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        anyhow::bail!(
            "refusing to overwrite existing key file {} (pass --force to replace it)",
            args.out.display()
        );
    }

    let keypair = PorterKeypair::generate();
    std::fs::write(&args.out, keypair.secret_key_hex())
        .with_context(|| format!("failed to write key file {}", args.out.display()))?;

    // Restrict permissions on Unix. A world-readable key file is not a
    // key file, it's a donation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&args.out, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", args.out.display()))?;
    }

    println!("Signer keypair generated.");
    println!("  Address  : {}", keypair.address_checksum());
    println!("  Key file : {}", args.out.display());

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("porter-relayer {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", porter_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Deterministic demo address: the trailing 20 bytes of a keccak digest,
/// the same way chain addresses fall out of public keys.
fn derived_address(tag: &[u8]) -> Address {
    Address::from_slice(&keccak256(tag)[12..])
}

/// Pulls the minted token id out of `mint(address)` return data. Falls
/// back to zero if the data doesn't decode — the demo mints on a fresh
/// ledger, where zero is also the right answer.
fn decode_minted_id(return_data: &[u8]) -> U256 {
    ethers::abi::decode(&[ethers::abi::ParamType::Uint(256)], return_data)
        .ok()
        .and_then(|mut tokens| tokens.pop())
        .and_then(|token| token.into_uint())
        .unwrap_or_default()
}
