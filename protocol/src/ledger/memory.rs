//! # In-Process Ledger
//!
//! [`DevLedger`] is the development-loop stand-in for a real chain
//! deployment: nonces in a map, receipts in a map, target contracts as
//! trait objects. It exists so the full relay pipeline — build, sign,
//! submit, classify — runs in a test without a node on the other end.
//!
//! It is deliberately faithful where faithfulness is load-bearing:
//!
//! - verify-and-execute is one critical section. Signature check, nonce
//!   check, nonce increment, and target execution happen under a single
//!   lock, so concurrent submissions serialize and a nonce can never be
//!   consumed twice.
//! - a target fault does not roll back the nonce. Authorization was
//!   valid; the request is spent.
//! - a revert discards the target's logs and surfaces an `Error(string)`
//!   payload, the way an EVM revert would.
//!
//! And deliberately unfaithful where it buys nothing: gas is accounted
//! with a flat intrinsic-plus-calldata formula, and out-of-gas failures
//! carry a readable reason instead of an empty payload. A dev ledger
//! that makes you guess is a dev ledger nobody uses.

use chrono::Utc;
use dashmap::DashMap;
use ethers::types::{Address, Bytes, H256, U256};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BASE_EXECUTION_GAS, GAS_PER_CALLDATA_BYTE};
use crate::crypto::recover_signer;
use crate::forward::{codec, SignedForwardRequest, SigningDomain};

use super::{
    encode_revert_reason, execution_id, ExecutionRecord, ExecutionResult, ExecutionStatus, Ledger,
    LedgerError, LogEntry,
};

// ---------------------------------------------------------------------------
// Target contracts
// ---------------------------------------------------------------------------

/// What a mounted target sees when the ledger invokes it.
///
/// `sender` is the *verified* signer of the forwarded request, not the
/// relayer that submitted it. Targets authorize against this field and
/// nothing else — the appended-sender convention, enforced here by
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct CallEnv<'a> {
    /// The verified signer. Treat as `msg.sender`.
    pub sender: Address,
    /// The address this target is mounted at. Treat as `address(this)`.
    pub target: Address,
    /// Value forwarded with the call.
    pub value: U256,
    /// Raw calldata: 4-byte selector plus ABI-encoded arguments.
    pub data: &'a [u8],
}

/// Output of a successful target call.
#[derive(Debug, Clone, Default)]
pub struct TargetOutcome {
    /// ABI-encoded return value, possibly empty.
    pub return_data: Bytes,
    /// Log entries to append, in emission order.
    pub logs: Vec<LogEntry>,
}

/// A target fault. Targets fail by reverting with a reason; there is no
/// other failure mode at this layer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("reverted: {reason}")]
pub struct TargetRevert {
    pub reason: String,
}

impl TargetRevert {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// An executable contract the dev ledger can mount at an address.
///
/// Implementations are synchronous and must be `Send + Sync` — the
/// ledger calls them while holding its state lock, which is what makes
/// execution serializing. Do not block in here on anything slower than
/// arithmetic.
pub trait TargetContract: Send + Sync {
    fn call(&self, env: CallEnv<'_>) -> Result<TargetOutcome, TargetRevert>;
}

// ---------------------------------------------------------------------------
// The dev ledger
// ---------------------------------------------------------------------------

/// Nonce book. Lives behind the one mutex that makes everything atomic.
#[derive(Debug, Default)]
struct LedgerState {
    nonces: HashMap<Address, U256>,
}

/// An in-memory [`Ledger`] with mountable targets and a kill switch.
///
/// Construction takes the signing domain the ledger verifies against —
/// the dev ledger plays the part of the verifying contract, so it must
/// know the exact domain signers bound their signatures to. A request
/// signed for a different domain recovers to a different address and is
/// rejected, which is the whole point of domain separation.
pub struct DevLedger {
    domain: SigningDomain,
    state: Mutex<LedgerState>,
    receipts: DashMap<H256, ExecutionRecord>,
    targets: RwLock<HashMap<Address, Arc<dyn TargetContract>>>,
    offline: AtomicBool,
}

impl DevLedger {
    pub fn new(domain: SigningDomain) -> Self {
        Self {
            domain,
            state: Mutex::new(LedgerState::default()),
            receipts: DashMap::new(),
            targets: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// The domain this ledger verifies signatures against.
    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// Mounts a target contract at an address. Calls to any unmounted
    /// address succeed as no-ops, the way an EVM call to codeless
    /// territory does.
    pub fn register_target(&self, address: Address, target: Arc<dyn TargetContract>) {
        self.targets.write().insert(address, target);
    }

    /// Simulates an infrastructure outage. While offline, every trait
    /// method fails with [`LedgerError::Unavailable`]. For exercising
    /// the unhappy paths nobody exercises.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable {
                reason: "dev ledger is offline".to_string(),
            });
        }
        Ok(())
    }

    /// Flat gas accounting: intrinsic cost plus a per-byte calldata charge.
    fn gas_cost(data_len: usize) -> U256 {
        U256::from(BASE_EXECUTION_GAS) + U256::from(GAS_PER_CALLDATA_BYTE) * U256::from(data_len)
    }
}

#[async_trait]
impl Ledger for DevLedger {
    async fn get_nonce(&self, signer: Address) -> Result<U256, LedgerError> {
        self.ensure_online()?;
        let state = self.state.lock();
        Ok(state.nonces.get(&signer).copied().unwrap_or_default())
    }

    async fn verify_and_execute(
        &self,
        signed: &SignedForwardRequest,
    ) -> Result<ExecutionResult, LedgerError> {
        self.ensure_online()?;

        let request = &signed.request;
        let digest = codec::signing_payload(&self.domain, request);

        // One lock from first check to committed result. Everything below
        // is synchronous; contention serializes, which is the contract.
        let mut state = self.state.lock();

        // Signature first: re-derive the signer from the wire bytes and
        // our own domain. The submitter's claims carry no weight here.
        match recover_signer(digest, signed.signature.as_ref()) {
            Some(recovered) if recovered == request.from => {}
            recovered => return Err(LedgerError::SignatureRejected { recovered }),
        }

        // Nonce second: exact match against the stored next-nonce, then
        // increment before the target runs. From this line on the request
        // is spent, whatever the target does.
        let expected = state.nonces.get(&request.from).copied().unwrap_or_default();
        if request.nonce != expected {
            return Err(LedgerError::NonceMismatch {
                signer: request.from,
                expected,
                got: request.nonce,
            });
        }
        state.nonces.insert(request.from, expected + U256::one());

        let cost = Self::gas_cost(request.data.len());
        let result = if cost > request.gas {
            // Budget exhausted before the target ran. A real chain hands
            // back empty return data here; we spend four words explaining.
            ExecutionResult {
                success: false,
                return_data: encode_revert_reason("PorterLedger: out of gas"),
                gas_used: request.gas,
                logs: Vec::new(),
            }
        } else {
            let target = self.targets.read().get(&request.to).cloned();
            match target {
                None => ExecutionResult {
                    success: true,
                    return_data: Bytes::default(),
                    gas_used: cost,
                    logs: Vec::new(),
                },
                Some(contract) => {
                    let env = CallEnv {
                        sender: request.from,
                        target: request.to,
                        value: request.value,
                        data: request.data.as_ref(),
                    };
                    match contract.call(env) {
                        Ok(outcome) => ExecutionResult {
                            success: true,
                            return_data: outcome.return_data,
                            gas_used: cost,
                            logs: outcome.logs,
                        },
                        Err(revert) => ExecutionResult {
                            success: false,
                            return_data: encode_revert_reason(&revert.reason),
                            gas_used: cost,
                            logs: Vec::new(),
                        },
                    }
                }
            }
        };

        let id = execution_id(digest, signed.signature.as_ref());
        let record = ExecutionRecord {
            execution_id: id,
            signer: request.from,
            target: request.to,
            nonce: request.nonce,
            status: if result.success {
                ExecutionStatus::Succeeded
            } else {
                ExecutionStatus::Reverted
            },
            result: result.clone(),
            executed_at: Utc::now(),
        };
        self.receipts.insert(id, record);

        Ok(result)
    }

    async fn execution_status(
        &self,
        execution_id: H256,
    ) -> Result<Option<ExecutionRecord>, LedgerError> {
        self.ensure_online()?;
        Ok(self.receipts.get(&execution_id).map(|r| r.value().clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
