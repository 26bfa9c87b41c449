//! # Signing Payload Codec
//!
//! Deterministic encoding of a `(domain, request)` pair into the exact
//! 32-byte digest a signer signs and a verifier recomputes. Pure functions
//! all the way down: no state, no side effects, identical output for
//! identical input, forever.
//!
//! ## The schema is load-bearing
//!
//! The payload is `keccak256(0x19 || 0x01 || domain_separator ||
//! struct_hash)`, with both inner hashes computed over ABI-encoded words
//! prefixed by a hash of their *type string*. Field order, field set, type
//! names, even the absence of spaces in the type strings — all of it is
//! part of the signature. Change any of it and every signature ever
//! produced under the old schema stops verifying.
//!
//! That is not an accident to be papered over; it's the versioning
//! mechanism. A deliberate schema change must come with a new domain
//! `version`, which strands old signatures loudly instead of letting them
//! half-verify quietly.
//!
//! ## Typed-data documents
//!
//! Wallets don't sign raw digests — they sign structured documents they
//! can display to a human first. [`typed_data`] emits the JSON document
//! describing this exact schema so an external wallet arrives at the same
//! 32 bytes we do.

use ethers::abi::{self, Token};
use ethers::types::{H256, U256};
use ethers::utils::to_checksum;
use serde_json::{json, Value};

use crate::crypto::{keccak256, keccak256_multi};
use crate::forward::types::{ForwardRequest, SigningDomain};

// ---------------------------------------------------------------------------
// Schema constants
// ---------------------------------------------------------------------------

/// Canonical type string of the signing domain. The field list mirrors
/// [`SigningDomain`] exactly, in declaration order, with no spaces.
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Canonical type string of the request struct. Mirrors
/// [`ForwardRequest`] field order exactly.
pub const REQUEST_TYPE: &str =
    "ForwardRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data)";

/// The two-byte prefix that turns `domain_separator || struct_hash` into
/// the final preimage. `0x19` marks "this is not a transaction", `0x01`
/// selects the structured-data flavor. Fixed forever.
pub const PAYLOAD_PREFIX: [u8; 2] = [0x19, 0x01];

/// Hash of [`DOMAIN_TYPE`], the first word of the domain encoding.
pub fn domain_type_hash() -> H256 {
    H256::from(keccak256(DOMAIN_TYPE.as_bytes()))
}

/// Hash of [`REQUEST_TYPE`], the first word of the struct encoding.
pub fn request_type_hash() -> H256 {
    H256::from(keccak256(REQUEST_TYPE.as_bytes()))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Computes the 32-byte domain separator for a signing domain.
///
/// `keccak256(abi_encode(typeHash, keccak256(name), keccak256(version),
/// chainId, verifyingContract))`. Strings are hashed before encoding so
/// every field occupies exactly one word.
pub fn domain_separator(domain: &SigningDomain) -> H256 {
    let encoded = abi::encode(&[
        Token::FixedBytes(domain_type_hash().as_bytes().to_vec()),
        Token::FixedBytes(keccak256(domain.name.as_bytes()).to_vec()),
        Token::FixedBytes(keccak256(domain.version.as_bytes()).to_vec()),
        Token::Uint(U256::from(domain.chain_id)),
        Token::Address(domain.verifying_contract),
    ]);
    H256::from(keccak256(&encoded))
}

/// Computes the 32-byte struct hash of a request.
///
/// The dynamic `data` field enters as `keccak256(data)`, never raw —
/// the struct hash covers a fixed seven words no matter how large the
/// calldata is.
pub fn struct_hash(request: &ForwardRequest) -> H256 {
    let encoded = abi::encode(&[
        Token::FixedBytes(request_type_hash().as_bytes().to_vec()),
        Token::Address(request.from),
        Token::Address(request.to),
        Token::Uint(request.value),
        Token::Uint(request.gas),
        Token::Uint(request.nonce),
        Token::FixedBytes(keccak256(request.data.as_ref()).to_vec()),
    ]);
    H256::from(keccak256(&encoded))
}

/// Computes the digest the signer signs and the verifier recomputes.
///
/// This is the codec's single product. Everything else in this module is
/// an intermediate of this function, exposed because tests and external
/// tooling want to inspect the layers.
pub fn signing_payload(domain: &SigningDomain, request: &ForwardRequest) -> H256 {
    H256::from(keccak256_multi(&[
        &PAYLOAD_PREFIX,
        domain_separator(domain).as_bytes(),
        struct_hash(request).as_bytes(),
    ]))
}

// ---------------------------------------------------------------------------
// Typed-data document
// ---------------------------------------------------------------------------

/// Builds the typed-data JSON document a wallet needs to produce the same
/// digest as [`signing_payload`].
///
/// Addresses are checksummed, quantities are decimal strings, calldata is
/// 0x-hex — the shapes wallet implementations have come to expect. The
/// document and the digest are two renderings of one schema; a test pins
/// them together so they can't drift apart.
pub fn typed_data(domain: &SigningDomain, request: &ForwardRequest) -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" },
            ],
            "ForwardRequest": [
                { "name": "from", "type": "address" },
                { "name": "to", "type": "address" },
                { "name": "value", "type": "uint256" },
                { "name": "gas", "type": "uint256" },
                { "name": "nonce", "type": "uint256" },
                { "name": "data", "type": "bytes" },
            ],
        },
        "domain": {
            "name": domain.name,
            "version": domain.version,
            "chainId": domain.chain_id,
            "verifyingContract": to_checksum(&domain.verifying_contract, None),
        },
        "primaryType": "ForwardRequest",
        "message": {
            "from": to_checksum(&request.from, None),
            "to": to_checksum(&request.to, None),
            "value": request.value.to_string(),
            "gas": request.gas.to_string(),
            "nonce": request.nonce.to_string(),
            "data": format!("{}", request.data),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
