//! # Hashing Utilities
//!
//! Keccak-256 and the small zoo of derived encodings the protocol needs.
//! One hash function, used everywhere, and we refuse to support more
//! without a very good reason:
//!
//! - **Keccak-256** — the original Keccak submission with the pre-NIST
//!   padding, because that's what the executing ledger uses for every
//!   digest, address, selector, and log topic. Not SHA-3. If you swap in
//!   SHA-3 "because it's standardized", every signature in the system
//!   silently stops verifying. Don't.
//!
//! On top of the raw digest this module provides the three encodings that
//! keep showing up at call sites: 4-byte function selectors, and the
//! 32-byte topic forms of addresses and unsigned integers used in log
//! entries.

use ethers::types::{Address, H256, U256};
use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. This is the workhorse
/// of the protocol — request digests, domain separators, selectors, and
/// event topics all bottom out here.
///
/// # Example
///
/// ```
/// use porter_protocol::crypto::keccak256;
///
/// let digest = keccak256(b"porter protocol");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Instead of allocating a buffer to concatenate inputs, we feed them
/// sequentially into the hasher. Same result, less allocation. The signing
/// payload is built exactly this way: `(prefix || domain_separator ||
/// struct_hash)` never exists as a contiguous buffer.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Compute the 4-byte function selector for a canonical signature string.
///
/// The selector is the first four bytes of the Keccak-256 digest of the
/// signature with no spaces and no parameter names, e.g. `mint(address)`
/// or `transfer(address,uint256)`. Get the canonical form wrong — a stray
/// space, a `uint` instead of `uint256` — and you get a selector for a
/// function that doesn't exist. The ledger will happily call it anyway.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Encode an address as a 32-byte log topic: twelve zero bytes, then the
/// twenty address bytes. The same left-padded form the ABI uses for a
/// word-sized `address`.
pub fn topic_for_address(address: Address) -> H256 {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address.as_bytes());
    H256::from(out)
}

/// Encode an unsigned integer as a 32-byte big-endian log topic.
pub fn topic_for_uint(value: U256) -> H256 {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    H256::from(out)
}

/// Recover the address from a left-padded 32-byte topic.
///
/// The inverse of [`topic_for_address`]. No validation of the padding
/// bytes — topics come from logs we emitted ourselves or from tests.
pub fn address_from_topic(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}
