//! # CLI Interface
//!
//! Command-line argument structure for `porter-relayer` using `clap`
//! derive. Three subcommands: `demo`, `keygen`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PORTER relay operator binary.
///
/// Drives the gasless relay pipeline: builds forward requests, verifies
/// signatures, submits to the ledger, and classifies receipts against a
/// configured emitter registry.
#[derive(Parser, Debug)]
#[command(
    name = "porter-relayer",
    about = "PORTER gasless relay operator",
    version,
    propagate_version = true
)]
pub struct PorterRelayerCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the relayer binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full relay lifecycle against an in-process dev ledger —
    /// mint, transfer, and a replay rejection, with receipts on stdout.
    Demo(DemoArgs),
    /// Generate a fresh signer keypair and write the secret to a file.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Path to the relayer configuration file (TOML).
    ///
    /// When omitted, built-in devnet defaults are used.
    #[arg(long, short = 'c', env = "PORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "PORTER_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Path the hex-encoded secret key is written to.
    #[arg(long, short = 'o', env = "PORTER_KEY_PATH", default_value = "signer.key")]
    pub out: PathBuf,

    /// Overwrite an existing key file.
    ///
    /// Off by default on purpose: clobbering a key file destroys an
    /// identity, and identities don't come back.
    #[arg(long)]
    pub force: bool,
}
