//! # Protocol Configuration & Constants
//!
//! Every magic number in PORTER lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values feed the signing payload in one way or another.
//! Changing them invalidates every signature produced under the old values,
//! so treat this file like consensus code: edit during devnet, then never.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol fingerprint for identification in logs and handshakes.
pub const PROTOCOL_FINGERPRINT: &str = "ALAS-PORTER-2026";

/// The full crate version string, assembled at compile time so we don't
/// allocate for something this trivial at runtime.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Signing Domain Defaults
// ---------------------------------------------------------------------------

/// Default domain name baked into the signing payload. This is the name the
/// verifying forwarder announces, not a marketing string — wallets display
/// it, and the executing ledger recomputes the domain separator from it.
pub const DEFAULT_DOMAIN_NAME: &str = "PorterForwarder";

/// Default domain version. Starts life at "0.0.1" and only moves when the
/// payload schema itself changes — at which point every outstanding
/// signature dies, which is exactly the point of putting it in the domain.
pub const DEFAULT_DOMAIN_VERSION: &str = "0.0.1";

/// Chain id for the local development ledger. 31337 by long-standing
/// convention of local EVM devnets; everyone's tooling expects it.
pub const CHAIN_ID_DEVNET: u64 = 31337;

/// Ethereum mainnet chain id. Listed for `chain_name`, not because anything
/// in this repository should be pointed at mainnet yet.
pub const CHAIN_ID_MAINNET: u64 = 1;

/// Sepolia testnet chain id.
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// secp256k1 with public-key recovery — not our favorite curve, but the
/// only one that lets a verifier derive the signer's address from the
/// signature alone, which is the whole trick this protocol is built on.
pub const SIGNING_ALGORITHM: &str = "secp256k1-recoverable";

/// Every digest in this protocol is Keccak-256. Not SHA-3 (the padding
/// differs), not SHA-256. Keccak, because the ledger speaks Ethereum.
pub const PRIMARY_HASH_FUNCTION: &str = "Keccak-256";

/// Recoverable signature length: 32-byte `r`, 32-byte `s`, 1-byte recovery
/// id. 65 bytes. If yours isn't, something has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 65;

/// Digest and log-topic width in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// Identity (address) width in bytes: the trailing 20 bytes of the keccak
/// digest of the uncompressed public key.
pub const ADDRESS_LENGTH: usize = 20;

/// Function selector width: the leading 4 bytes of the keccak digest of the
/// canonical function signature.
pub const SELECTOR_LENGTH: usize = 4;

// ---------------------------------------------------------------------------
// Gas Policy
// ---------------------------------------------------------------------------

/// Default gas ceiling attached to a request when the caller doesn't
/// override it. A deliberate overestimate, not a measured estimate:
/// underestimating risks a mid-execution failure that still consumes the
/// nonce and still costs the relayer money. Overestimating costs nothing
/// extra on success.
pub const DEFAULT_GAS_CEILING: u64 = 500_000;

/// Hard cap on the gas a single request may carry. Above this we refuse to
/// build or relay — the relayer fronts the cost, and the relayer is not a
/// charity.
pub const MAX_GAS_CEILING: u64 = 5_000_000;

/// Base cost the dev ledger charges per execution, before calldata.
/// Matches the EVM's intrinsic transaction cost so numbers look familiar.
pub const BASE_EXECUTION_GAS: u64 = 21_000;

/// Simulated per-byte calldata cost in the dev ledger. The EVM charges 16
/// per non-zero byte and 4 per zero byte; we charge a flat 16 because the
/// dev ledger's gas model exists to exercise budget failures, not to bill
/// anyone.
pub const GAS_PER_CALLDATA_BYTE: u64 = 16;

// ---------------------------------------------------------------------------
// Request Limits
// ---------------------------------------------------------------------------

/// Maximum calldata size accepted in a request. 128 KiB is far beyond any
/// sane target action and small enough to keep hashing cheap.
pub const MAX_CALLDATA_BYTES: usize = 128 * 1024;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a chain id, mainly for logging.
/// Unknown chains get the raw number because we're helpful like that.
pub fn chain_name(chain_id: u64) -> String {
    match chain_id {
        CHAIN_ID_MAINNET => "mainnet".to_string(),
        CHAIN_ID_SEPOLIA => "sepolia".to_string(),
        CHAIN_ID_DEVNET => "devnet".to_string(),
        other => format!("chain({})", other),
    }
}
