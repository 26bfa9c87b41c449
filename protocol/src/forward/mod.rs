//! # Forward Requests
//!
//! Everything that happens on the signer's side of the wire: the request
//! and domain types ([`types`]), the deterministic signing-payload codec
//! ([`codec`]), and the builder that assembles a signable request from a
//! caller's intent ([`builder`]).
//!
//! The division of labor is strict. Types carry data and say nothing
//! about hashing. The codec derives digests and documents and performs
//! no I/O. The builder talks to the ledger for a nonce and delegates
//! every byte of payload derivation to the codec. If you find yourself
//! hashing in the builder or fetching in the codec, you are in the wrong
//! file.

pub mod builder;
pub mod codec;
pub mod types;

pub use builder::{PreparedRequest, RequestBuilder};
pub use codec::{signing_payload, struct_hash, typed_data};
pub use types::{ForwardRequest, SignedForwardRequest, SigningDomain, TargetCall};
