//! Core type definitions for forwarded requests.
//!
//! These types form the vocabulary of every relay: the domain a signature
//! is bound to, the request a signer authorizes, and the signed envelope a
//! relayer submits. They are value types — a request has no identity
//! beyond its field tuple, and two structurally equal requests are
//! interchangeable everywhere in the pipeline.

use ethers::types::{Address, Bytes, Signature, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config;

// ---------------------------------------------------------------------------
// SigningDomain
// ---------------------------------------------------------------------------

/// The deployment context a signature is bound to.
///
/// Signatures produced under one domain are unverifiable under any other —
/// that's the entire purpose. A request signed against the devnet
/// forwarder cannot be replayed against a staging deployment, a different
/// chain, or a future incompatible payload schema, because each of those
/// changes at least one of these four fields.
///
/// Constructed once at process start from configuration and treated as
/// immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    /// The forwarder's announced name. Part of the signed payload, so
    /// changing it strands every outstanding signature.
    pub name: String,
    /// Payload schema version. Bump it when the encoding changes and the
    /// old signatures die with the old version — that's the feature.
    pub version: String,
    /// Chain the verifying forwarder lives on.
    pub chain_id: u64,
    /// Address of the forwarder that will verify and execute.
    pub verifying_contract: Address,
}

impl SigningDomain {
    /// Creates a new signing domain.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// The default devnet domain for a forwarder deployed at the given
    /// address. What the demo and most tests use.
    pub fn devnet(verifying_contract: Address) -> Self {
        Self::new(
            config::DEFAULT_DOMAIN_NAME,
            config::DEFAULT_DOMAIN_VERSION,
            config::CHAIN_ID_DEVNET,
            verifying_contract,
        )
    }
}

impl fmt::Display for SigningDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} on {} at {}",
            self.name,
            self.version,
            config::chain_name(self.chain_id),
            self.verifying_contract
        )
    }
}

// ---------------------------------------------------------------------------
// ForwardRequest
// ---------------------------------------------------------------------------

/// An authorization for one action: "signer `from` authorizes sending
/// `value` and up to `gas` budget to `to`, invoking it with `data`, using
/// `nonce`."
///
/// Immutable once constructed. The `nonce` must equal the ledger's
/// currently stored next-nonce for `from` at verification time — that
/// equality is the sole replay-protection mechanism in the protocol, which
/// is why the ledger checks it atomically and everyone else only
/// pre-checks it as a courtesy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// The signer whose authority this request carries.
    pub from: Address,
    /// The target the ledger will invoke.
    pub to: Address,
    /// Native value forwarded with the call. Usually zero — the point of
    /// the protocol is that the signer holds no funds.
    pub value: U256,
    /// Gas budget for the inner call. A deliberate overestimate by
    /// default; see `config::DEFAULT_GAS_CEILING` for the reasoning.
    pub gas: U256,
    /// The signer's next-nonce at build time.
    pub nonce: U256,
    /// Calldata for the target, already ABI-encoded.
    pub data: Bytes,
}

impl fmt::Display for ForwardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ForwardRequest({} -> {}, nonce {}, gas {}, {} data bytes)",
            self.from,
            self.to,
            self.nonce,
            self.gas,
            self.data.len()
        )
    }
}

// ---------------------------------------------------------------------------
// SignedForwardRequest
// ---------------------------------------------------------------------------

/// A request plus the signature that authorizes it — the unit submitted
/// to the relayer.
///
/// The signature is 65 raw bytes (`r || s || v`) over the domain-separated
/// digest of the request, produced by whoever holds the key for
/// `request.from`. It stays as opaque bytes here; parsing and recovery are
/// the verifier's business, and a malformed signature is a *rejection*,
/// not a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedForwardRequest {
    /// The authorized request.
    pub request: ForwardRequest,
    /// Recoverable signature over the request's signing payload.
    pub signature: Bytes,
}

impl SignedForwardRequest {
    /// Bundles a request with a signature produced for it.
    pub fn new(request: ForwardRequest, signature: &Signature) -> Self {
        Self {
            request,
            signature: Bytes::from(signature.to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// TargetCall
// ---------------------------------------------------------------------------

/// A target-action descriptor: what the signer wants done, before it's
/// wrapped in a request.
///
/// `to` and `data` are mandatory — they *are* the action. `value` and
/// `gas` are optional; the builder fills in zero and the configured gas
/// ceiling when the caller doesn't care, which is almost always.
///
/// # Examples
///
/// ```
/// use porter_protocol::forward::TargetCall;
/// use ethers::types::{Address, Bytes, U256};
///
/// let call = TargetCall::new(Address::random(), Bytes::from(vec![0x6a, 0x62, 0x78, 0x42]))
///     .with_gas(U256::from(120_000u64));
/// assert!(call.value.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCall {
    /// The contract to invoke.
    pub to: Address,
    /// ABI-encoded calldata for the invocation.
    pub data: Bytes,
    /// Native value to forward. Defaults to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Gas budget override. Defaults to the builder's configured ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

impl TargetCall {
    /// Creates a call descriptor with default value and gas.
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: None,
            gas: None,
        }
    }

    /// Sets an explicit value to forward.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets an explicit gas budget, overriding the builder's ceiling.
    pub fn with_gas(mut self, gas: U256) -> Self {
        self.gas = Some(gas);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
