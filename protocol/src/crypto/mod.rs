//! # Cryptographic Primitives for PORTER
//!
//! Everything security-related in the relay pipeline flows through here:
//! the digests that become signing payloads, the selectors and topics that
//! shape calldata and logs, and the keypairs that sign in tests and demos.
//!
//! We deliberately chose boring, compatible cryptography:
//!
//! - **Keccak-256** for every digest — because the executing ledger does.
//! - **secp256k1 recoverable ECDSA** for signatures — because deriving the
//!   signer from the signature is the protocol's load-bearing trick.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again. Then go read about timing attacks
//! and come back when you've lost the urge.

pub mod hash;
pub mod keys;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy. Life's too short for five levels of `use` statements.
pub use hash::{keccak256, keccak256_multi, selector, topic_for_address, topic_for_uint};
pub use keys::{recover_signer, KeyError, PorterKeypair};
