//! # The Ledger Contract
//!
//! The ledger is the durable, serializing executor this protocol defers
//! to: it owns nonce storage per signer, it runs target actions, and it is
//! the only party whose opinion on replay protection matters. Everything
//! in this crate that checks a signature or a nonce before submission is
//! advisory; the ledger's atomic verify-and-execute is the verdict.
//!
//! This module defines the seam — the [`Ledger`] trait and the value types
//! that cross it. A production deployment implements the trait against a
//! real chain endpoint; [`memory::DevLedger`] implements it in-process for
//! tests, demos, and local development.
//!
//! ## Atomicity, spelled out
//!
//! `verify_and_execute` must validate the signature, compare the request
//! nonce to the stored next-nonce, increment it, and run the target as one
//! indivisible step. Two relays racing with the same nonce must resolve to
//! exactly one execution and one [`LedgerError::NonceMismatch`] — never
//! two executions, never zero. Split the check from the increment and
//! you've built a replay machine with extra steps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::keccak256_multi;
use crate::forward::SignedForwardRequest;

pub mod memory;

pub use memory::{CallEnv, DevLedger, TargetContract, TargetOutcome, TargetRevert};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a ledger.
///
/// The first variant is infrastructure; the other two are verdicts. The
/// distinction matters for retries: a nonce read that hit `Unavailable`
/// can be repeated freely, but a `verify_and_execute` call must never be
/// blindly resubmitted — the caller cannot know whether the state change
/// landed before the failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport or storage failure. The operation may or may not have
    /// reached the ledger.
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },

    /// The atomic step re-derived the signer and it didn't match the
    /// request. `recovered` is `None` when the signature didn't even
    /// parse.
    #[error("signature does not match request")]
    SignatureRejected { recovered: Option<Address> },

    /// The request nonce is not the stored next-nonce for the signer.
    /// Stale, replayed, or submitted out of order — the ledger can't tell
    /// and doesn't care.
    #[error("nonce mismatch for {signer}: expected {expected}, got {got}")]
    NonceMismatch {
        signer: Address,
        expected: U256,
        got: U256,
    },
}

// ---------------------------------------------------------------------------
// Execution results
// ---------------------------------------------------------------------------

/// A log entry appended by the ledger during execution.
///
/// Opaque at this layer: `topics` and `data` mean whatever the emitting
/// contract says they mean. Decoding them against known schemas is the
/// receipt classifier's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The contract that emitted the entry.
    pub emitter: Address,
    /// Indexed words, topic 0 conventionally identifying the event.
    pub topics: Vec<H256>,
    /// ABI-encoded non-indexed fields.
    pub data: Bytes,
}

/// The durable outcome of one `verify_and_execute` call.
///
/// `success` reports the *inner* target action. A result with
/// `success == false` still consumed the signer's nonce — authorization
/// passed, the action faulted, and the request is spent either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the target action completed without reverting.
    pub success: bool,
    /// The target's return data on success, or its encoded revert reason.
    pub return_data: Bytes,
    /// Gas actually consumed, as accounted by the ledger.
    pub gas_used: U256,
    /// Log entries appended during execution, in emission order. Empty
    /// when the inner action reverted — a revert unwinds its logs.
    pub logs: Vec<LogEntry>,
}

/// Headline status of a recorded execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The target action completed.
    Succeeded,
    /// Authorization passed but the target action reverted. The nonce is
    /// spent regardless.
    Reverted,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Reverted => write!(f, "Reverted"),
        }
    }
}

/// The ledger's durable record of one execution, retrievable by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Content-derived identifier; see [`execution_id`].
    pub execution_id: H256,
    /// The signer whose nonce this execution consumed.
    pub signer: Address,
    /// The target that was invoked.
    pub target: Address,
    /// The nonce value consumed.
    pub nonce: U256,
    /// Succeeded or Reverted.
    pub status: ExecutionStatus,
    /// The full result, logs included, for later re-classification.
    pub result: ExecutionResult,
    /// When the ledger committed the execution.
    pub executed_at: DateTime<Utc>,
}

/// Derives the execution id for a signed request: the keccak digest of
/// the signing payload concatenated with the signature bytes.
///
/// Content-derived on purpose — anyone holding the signed request can
/// compute the id and poll for status without the ledger assigning one.
/// A replayed submission maps to the same id, which is exactly right: it
/// *is* the same request.
pub fn execution_id(signing_payload: H256, signature: &[u8]) -> H256 {
    H256::from(keccak256_multi(&[signing_payload.as_bytes(), signature]))
}

// ---------------------------------------------------------------------------
// Revert data
// ---------------------------------------------------------------------------

/// Selector of the canonical `Error(string)` revert encoding.
const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// ABI-encodes a revert reason the way an EVM `revert("...")` does:
/// the `Error(string)` selector followed by the encoded string.
pub fn encode_revert_reason(reason: &str) -> Bytes {
    let mut out = REVERT_SELECTOR.to_vec();
    out.extend_from_slice(&abi::encode(&[Token::String(reason.to_string())]));
    Bytes::from(out)
}

/// Decodes an `Error(string)` revert payload back into its reason.
///
/// Returns `None` for empty data, foreign selectors, or malformed
/// encodings — reverts without a reason are legal, just unhelpful.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != REVERT_SELECTOR {
        return None;
    }
    let tokens = abi::decode(&[ParamType::String], &data[4..]).ok()?;
    tokens.into_iter().next()?.into_string()
}

// ---------------------------------------------------------------------------
// The trait
// ---------------------------------------------------------------------------

/// The executor this protocol submits to.
///
/// Object-safe and async: production implementations sit on the far side
/// of a network. The relayer holds one behind an `Arc<dyn Ledger>` and
/// never assumes anything about what's inside.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The stored next-nonce for a signer. Read-only; eventually
    /// consistent with the latest committed execution. A stale read here
    /// wastes a signature at worst — `verify_and_execute` re-checks.
    async fn get_nonce(&self, signer: Address) -> Result<U256, LedgerError>;

    /// The atomic step: validate the signature against the
    /// domain-separated payload, check the nonce, increment it, execute
    /// the target, and commit the result. Fails without consuming the
    /// nonce if either precondition fails.
    async fn verify_and_execute(
        &self,
        signed: &SignedForwardRequest,
    ) -> Result<ExecutionResult, LedgerError>;

    /// Looks up the durable record of a prior execution, if any.
    async fn execution_status(
        &self,
        execution_id: H256,
    ) -> Result<Option<ExecutionRecord>, LedgerError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
