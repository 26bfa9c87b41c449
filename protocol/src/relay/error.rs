//! # Relay Error Taxonomy
//!
//! Every failure the relay pipeline can hand a caller, in one enum. The
//! variants are deliberately coarse — five causes a caller can act on,
//! not forty they can't:
//!
//! - [`RelayError::MalformedRequest`]: fix your inputs and rebuild.
//! - [`RelayError::SignatureMismatch`]: re-sign; the payload and the
//!   signature disagree.
//! - [`RelayError::NonceReused`]: rebuild against the current nonce;
//!   someone (possibly you) got there first.
//! - [`RelayError::LedgerUnavailable`]: infrastructure. Reads may be
//!   retried; an interrupted submission must be re-checked, not resent.
//! - [`RelayError::TargetActionFailed`]: authorization held, the target
//!   reverted, and the nonce is spent. A retry needs a fresh signature.

use ethers::types::{Address, H256, U256};
use thiserror::Error;

use crate::ledger::LedgerError;

/// Failures surfaced by request building, verification, and relaying.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request is structurally unusable: zero signer, oversized
    /// calldata, a gas budget of zero or past the hard ceiling. Caught
    /// before any signature or ledger work.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// The signature does not recover to the declared signer.
    /// `recovered` is the address that *did* fall out of recovery, or
    /// `None` when the bytes didn't parse as a signature at all.
    #[error("signature mismatch for declared signer {expected}")]
    SignatureMismatch {
        expected: Address,
        recovered: Option<Address>,
    },

    /// The request nonce has already been consumed (or skips ahead).
    /// The signed payload is spent and can never be resubmitted.
    #[error("nonce reused for {signer}: ledger expects {expected}, request carries {got}")]
    NonceReused {
        signer: Address,
        expected: U256,
        got: U256,
    },

    /// The ledger could not be reached or failed internally. Says
    /// nothing about the request itself.
    #[error("ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    /// Authorization passed, the target action reverted. The nonce is
    /// consumed; the execution record at `execution_id` holds the rest.
    #[error("target action failed: {reason}")]
    TargetActionFailed { execution_id: H256, reason: String },
}

impl RelayError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Maps a failure from a read-only ledger call. Reads have no
    /// merits to be rejected on, so anything beyond plain unavailability
    /// is the infrastructure misbehaving and is reported as such.
    pub(crate) fn ledger_read(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable { reason } => Self::LedgerUnavailable { reason },
            other => Self::LedgerUnavailable {
                reason: other.to_string(),
            },
        }
    }

    /// Maps a ledger verdict into this taxonomy. `expected_signer` is
    /// the `from` the request declared, which the ledger's rejection
    /// doesn't carry on its own.
    pub(crate) fn from_ledger(err: LedgerError, expected_signer: Address) -> Self {
        match err {
            LedgerError::Unavailable { reason } => Self::LedgerUnavailable { reason },
            LedgerError::SignatureRejected { recovered } => Self::SignatureMismatch {
                expected: expected_signer,
                recovered,
            },
            LedgerError::NonceMismatch {
                signer,
                expected,
                got,
            } => Self::NonceReused {
                signer,
                expected,
                got,
            },
        }
    }
}
