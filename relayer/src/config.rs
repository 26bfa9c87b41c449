//! # Relayer Configuration
//!
//! TOML-backed operator configuration. Four sections:
//!
//! | section | contents |
//! |---------|----------|
//! | `[ledger]` | endpoint of the executing ledger (unset = in-process dev ledger) |
//! | `[domain]` | the signing domain requests are bound to |
//! | `[gas]` | default gas ceiling stamped on built requests |
//! | `[[emitter]]` | known-emitter registry entries for receipt classification |
//!
//! Every field has a devnet default, so an empty file — or no file at
//! all — yields a working local setup. Event schemas are configured as
//! human-readable declarations (`"event Transfer(address indexed from,
//! ...)"`) and parsed into ABI schemas at load time, so a typo fails the
//! whole load instead of silently classifying nothing.

use anyhow::{Context, Result};
use ethers::abi::{Event, HumanReadableParser};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

use porter_protocol::config::{
    CHAIN_ID_DEVNET, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, DEFAULT_GAS_CEILING,
};
use porter_protocol::forward::SigningDomain;
use porter_protocol::receipt::{KnownEmitter, ReceiptClassifier};

/// Complete relayer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    pub ledger: LedgerConfig,
    pub domain: DomainConfig,
    pub gas: GasConfig,
    #[serde(rename = "emitter")]
    pub emitters: Vec<EmitterConfig>,
}

/// `[ledger]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Endpoint of the executing ledger. Unset means the in-process dev
    /// ledger, which is the only mode the demo wires up.
    pub endpoint: Option<String>,
}

/// `[domain]` section — the EIP-712 domain requests are signed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id: CHAIN_ID_DEVNET,
            verifying_contract: Address::zero(),
        }
    }
}

/// `[gas]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Gas budget stamped on requests that don't carry their own.
    pub default_ceiling: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            default_ceiling: DEFAULT_GAS_CEILING,
        }
    }
}

/// One `[[emitter]]` registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Human label attached to classified events from this address.
    pub label: String,
    pub address: Address,
    /// Human-readable event declarations. The `event ` keyword is
    /// optional.
    #[serde(default)]
    pub events: Vec<String>,
}

impl RelayerConfig {
    /// Loads and parses a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads the given path, or falls back to devnet defaults when no
    /// path was supplied.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("no config file supplied; using devnet defaults");
                Ok(Self::default())
            }
        }
    }

    /// The signing domain this configuration describes.
    pub fn signing_domain(&self) -> SigningDomain {
        SigningDomain::new(
            &self.domain.name,
            &self.domain.version,
            self.domain.chain_id,
            self.domain.verifying_contract,
        )
    }

    /// Builds the receipt classifier from the emitter registry, parsing
    /// every declared event schema. Fails on the first bad declaration.
    pub fn classifier(&self) -> Result<ReceiptClassifier> {
        let mut emitters = Vec::with_capacity(self.emitters.len());
        for entry in &self.emitters {
            let mut events = Vec::with_capacity(entry.events.len());
            for decl in &entry.events {
                events.push(parse_event_decl(decl)?);
            }
            emitters.push(KnownEmitter::new(entry.label.clone(), entry.address).with_events(events));
        }
        Ok(ReceiptClassifier::new(emitters))
    }
}

fn parse_event_decl(decl: &str) -> Result<Event> {
    let trimmed = decl.trim();
    let normalized = if trimmed.starts_with("event ") {
        trimmed.to_string()
    } else {
        format!("event {trimmed}")
    };
    HumanReadableParser::parse_event(&normalized)
        .map_err(|err| anyhow::anyhow!("invalid event declaration {decl:?}: {err}"))
}
