//! # The Relay Pipeline
//!
//! The [`Relayer`] is the untrusted courier at the center of this
//! protocol: it accepts signed forward requests from parties who won't
//! pay for gas, fronts the submission cost, and hands back a classified
//! receipt. It holds no keys and makes no promises a signature doesn't
//! already make.
//!
//! One `relay` call is one pipeline pass:
//!
//! 1. **Shape.** Structural validation of the request fields. Fails as
//!    [`RelayError::MalformedRequest`] before anything expensive runs.
//! 2. **Pre-flight.** The advisory [`Verifier`]: signature recovery,
//!    then a nonce read. Declines doomed requests without touching
//!    ledger state.
//! 3. **Submission.** Exactly one `verify_and_execute` call. No retry
//!    on any failure — an interrupted submission may have landed, and a
//!    landed submission consumed the nonce, so resending the same bytes
//!    is either a replay attempt or a guaranteed rejection.
//! 4. **Classification.** The execution's log entries, tagged against
//!    the known-emitter registry. Purely advisory; runs after the
//!    outcome is already durable.
//!
//! This module is also the crate's observability boundary. The tracing
//! calls live here, at the decision points; the codec, crypto, and
//! classifier layers below stay silent and pure.

use std::sync::Arc;

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_CALLDATA_BYTES, MAX_GAS_CEILING};
use crate::forward::{codec, ForwardRequest, SignedForwardRequest, SigningDomain};
use crate::ledger::{
    decode_revert_reason, execution_id, ExecutionRecord, ExecutionResult, Ledger, LogEntry,
};
use crate::receipt::{ClassifiedEvent, ReceiptClassifier};

pub mod error;
pub mod verify;

pub use error::RelayError;
pub use verify::Verifier;

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Checks the parts of a request that are wrong regardless of any
/// signature or ledger state.
pub fn validate_request(request: &ForwardRequest) -> Result<(), RelayError> {
    if request.from == Address::zero() {
        return Err(RelayError::malformed("signer is the zero address"));
    }
    if request.data.len() > MAX_CALLDATA_BYTES {
        return Err(RelayError::malformed(format!(
            "calldata is {} bytes, limit is {}",
            request.data.len(),
            MAX_CALLDATA_BYTES
        )));
    }
    if request.gas.is_zero() {
        return Err(RelayError::malformed("gas budget is zero"));
    }
    if request.gas > U256::from(MAX_GAS_CEILING) {
        return Err(RelayError::malformed(format!(
            "gas budget {} exceeds the hard ceiling {}",
            request.gas, MAX_GAS_CEILING
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What a successful relay hands back: the durable result plus the
/// classified view of its log entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayReceipt {
    /// Content-derived identifier; poll [`Relayer::execution_status`]
    /// with it later.
    pub execution_id: H256,
    /// The ledger's committed result, logs and all.
    pub result: ExecutionResult,
    /// One classified event per log entry, in emission order.
    pub events: Vec<ClassifiedEvent>,
}

// ---------------------------------------------------------------------------
// The relayer
// ---------------------------------------------------------------------------

/// Stateless relay front end over one domain, one ledger, and one
/// emitter registry.
///
/// Stateless is load-bearing: the relayer caches no nonces and keeps no
/// session record between calls. Every pipeline pass reads fresh state,
/// so concurrent passes interleave safely and the losing side of a
/// nonce race gets an honest [`RelayError::NonceReused`].
#[derive(Clone)]
pub struct Relayer {
    domain: SigningDomain,
    ledger: Arc<dyn Ledger>,
    verifier: Verifier,
    classifier: ReceiptClassifier,
}

impl Relayer {
    pub fn new(
        domain: SigningDomain,
        ledger: Arc<dyn Ledger>,
        classifier: ReceiptClassifier,
    ) -> Self {
        let verifier = Verifier::new(domain.clone(), ledger.clone());
        Self {
            domain,
            ledger,
            verifier,
            classifier,
        }
    }

    /// The signing domain requests must be bound to.
    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// The advisory pre-flight checks, usable standalone.
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// The classifier and its registry.
    pub fn classifier(&self) -> &ReceiptClassifier {
        &self.classifier
    }

    /// The execution id this request will have (or already has) on the
    /// ledger. Derivable by anyone holding the signed request, before or
    /// after submission.
    pub fn execution_id_for(&self, signed: &SignedForwardRequest) -> H256 {
        let digest = codec::signing_payload(&self.domain, &signed.request);
        execution_id(digest, signed.signature.as_ref())
    }

    /// Runs the full pipeline for one signed request.
    pub async fn relay(&self, signed: &SignedForwardRequest) -> Result<RelayReceipt, RelayError> {
        let request = &signed.request;

        validate_request(request)?;
        self.verifier.verify(signed).await?;

        tracing::info!(
            signer = %request.from,
            target = %request.to,
            nonce = %request.nonce,
            "submitting signed request to the ledger"
        );
        let result = self
            .ledger
            .verify_and_execute(signed)
            .await
            .map_err(|err| {
                let err = RelayError::from_ledger(err, request.from);
                tracing::warn!(signer = %request.from, error = %err, "ledger rejected submission");
                err
            })?;

        let execution_id = self.execution_id_for(signed);

        if !result.success {
            let reason = decode_revert_reason(result.return_data.as_ref())
                .unwrap_or_else(|| "target reverted without a reason".to_string());
            tracing::warn!(
                execution_id = %execution_id,
                signer = %request.from,
                reason = %reason,
                "target action failed; nonce is consumed"
            );
            return Err(RelayError::TargetActionFailed {
                execution_id,
                reason,
            });
        }

        let events = self.classifier.classify(&result.logs);
        tracing::info!(
            execution_id = %execution_id,
            gas_used = %result.gas_used,
            events = events.len(),
            "relay executed"
        );

        Ok(RelayReceipt {
            execution_id,
            result,
            events,
        })
    }

    /// The ledger's current next-nonce for a signer.
    pub async fn get_nonce(&self, signer: Address) -> Result<U256, RelayError> {
        self.ledger
            .get_nonce(signer)
            .await
            .map_err(RelayError::ledger_read)
    }

    /// Looks up the durable record of a past execution.
    pub async fn execution_status(
        &self,
        execution_id: H256,
    ) -> Result<Option<ExecutionRecord>, RelayError> {
        self.ledger
            .execution_status(execution_id)
            .await
            .map_err(RelayError::ledger_read)
    }

    /// Re-classifies arbitrary log entries against this relayer's
    /// registry. Useful for records fetched out of band.
    pub fn classify(&self, logs: &[LogEntry]) -> Vec<ClassifiedEvent> {
        self.classifier.classify(logs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GAS_CEILING;
    use crate::crypto::{topic_for_address, topic_for_uint, PorterKeypair};
    use crate::ledger::memory::{CallEnv, TargetContract, TargetOutcome, TargetRevert};
    use crate::ledger::{DevLedger, ExecutionStatus, LedgerError, LogEntry};
    use crate::receipt::{EventCategory, KnownEmitter};
    use async_trait::async_trait;
    use ethers::abi::{Event, EventParam, ParamType};
    use ethers::types::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits one Ping(sender, value) per call; reverts on a 0xFF lead
    /// byte.
    struct PingTarget;

    fn ping_event() -> Event {
        Event {
            name: "Ping".to_string(),
            inputs: vec![
                EventParam {
                    name: "sender".to_string(),
                    kind: ParamType::Address,
                    indexed: true,
                },
                EventParam {
                    name: "value".to_string(),
                    kind: ParamType::Uint(256),
                    indexed: true,
                },
            ],
            anonymous: false,
        }
    }

    impl TargetContract for PingTarget {
        fn call(&self, env: CallEnv<'_>) -> Result<TargetOutcome, TargetRevert> {
            if env.data.first() == Some(&0xFF) {
                return Err(TargetRevert::new("PingTarget: refused"));
            }
            Ok(TargetOutcome {
                return_data: Bytes::default(),
                logs: vec![LogEntry {
                    emitter: env.target,
                    topics: vec![
                        ping_event().signature(),
                        topic_for_address(env.sender),
                        topic_for_uint(env.value),
                    ],
                    data: Bytes::default(),
                }],
            })
        }
    }

    /// Delegating ledger that counts state-changing calls. Exists to
    /// pin the one-submission-per-relay property.
    struct CountingLedger {
        inner: Arc<DevLedger>,
        executions: AtomicUsize,
    }

    #[async_trait]
    impl Ledger for CountingLedger {
        async fn get_nonce(&self, signer: Address) -> Result<U256, LedgerError> {
            self.inner.get_nonce(signer).await
        }

        async fn verify_and_execute(
            &self,
            signed: &SignedForwardRequest,
        ) -> Result<ExecutionResult, LedgerError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.inner.verify_and_execute(signed).await
        }

        async fn execution_status(
            &self,
            execution_id: H256,
        ) -> Result<Option<ExecutionRecord>, LedgerError> {
            self.inner.execution_status(execution_id).await
        }
    }

    fn target_address() -> Address {
        Address::from_low_u64_be(0x1216)
    }

    fn setup() -> (Arc<CountingLedger>, Relayer) {
        let domain = SigningDomain::devnet(Address::from_low_u64_be(0xF0));
        let dev = Arc::new(DevLedger::new(domain.clone()));
        dev.register_target(target_address(), Arc::new(PingTarget));

        let ledger = Arc::new(CountingLedger {
            inner: dev,
            executions: AtomicUsize::new(0),
        });
        let classifier = ReceiptClassifier::new(vec![
            KnownEmitter::new("PingTarget", target_address()).with_event(ping_event()),
        ]);
        let relayer = Relayer::new(domain, ledger.clone(), classifier);
        (ledger, relayer)
    }

    fn build_signed(kp: &PorterKeypair, relayer: &Relayer, nonce: u64, data: Vec<u8>) -> SignedForwardRequest {
        let request = ForwardRequest {
            from: kp.address(),
            to: target_address(),
            value: U256::from(5u64),
            gas: U256::from(DEFAULT_GAS_CEILING),
            nonce: U256::from(nonce),
            data: Bytes::from(data),
        };
        let digest = codec::signing_payload(relayer.domain(), &request);
        let sig = kp.sign_digest(digest).unwrap();
        SignedForwardRequest::new(request, &sig)
    }

    #[tokio::test]
    async fn relays_and_classifies_in_one_pass() {
        let (ledger, relayer) = setup();
        let kp = PorterKeypair::generate();

        let signed = build_signed(&kp, &relayer, 0, vec![0x01]);
        let receipt = relayer.relay(&signed).await.unwrap();

        assert!(receipt.result.success);
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(receipt.events[0].category, EventCategory::KnownEvent);
        assert_eq!(receipt.events[0].name.as_deref(), Some("Ping"));
        let args = receipt.events[0].args.as_ref().unwrap();
        assert_eq!(args["sender"], format!("{:#x}", kp.address()));
        assert_eq!(args["value"], "5");

        assert_eq!(relayer.get_nonce(kp.address()).await.unwrap(), U256::one());
        assert_eq!(ledger.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_requests_never_reach_the_ledger() {
        let (ledger, relayer) = setup();
        let kp = PorterKeypair::generate();

        let mut signed = build_signed(&kp, &relayer, 0, vec![]);
        signed.request.from = Address::zero();
        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::MalformedRequest { .. })
        ));

        let mut signed = build_signed(&kp, &relayer, 0, vec![]);
        signed.request.gas = U256::zero();
        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::MalformedRequest { .. })
        ));

        let mut signed = build_signed(&kp, &relayer, 0, vec![]);
        signed.request.gas = U256::from(MAX_GAS_CEILING) + U256::one();
        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::MalformedRequest { .. })
        ));

        let oversized = vec![0u8; MAX_CALLDATA_BYTES + 1];
        let signed = build_signed(&kp, &relayer, 0, oversized);
        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::MalformedRequest { .. })
        ));

        assert_eq!(ledger.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pre_flight_failures_spend_nothing() {
        let (ledger, relayer) = setup();
        let signer = PorterKeypair::generate();
        let imposter = PorterKeypair::generate();

        // Imposter signs over `signer`'s identity.
        let mut signed = build_signed(&imposter, &relayer, 0, vec![]);
        signed.request.from = signer.address();
        let digest = codec::signing_payload(relayer.domain(), &signed.request);
        signed.signature = Bytes::from(imposter.sign_digest(digest).unwrap().to_vec());

        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::SignatureMismatch { .. })
        ));
        assert_eq!(ledger.executions.load(Ordering::SeqCst), 0);
        assert_eq!(
            relayer.get_nonce(signer.address()).await.unwrap(),
            U256::zero()
        );
    }

    #[tokio::test]
    async fn replay_is_rejected_and_submitted_at_most_once() {
        let (ledger, relayer) = setup();
        let kp = PorterKeypair::generate();

        let signed = build_signed(&kp, &relayer, 0, vec![0x01]);
        relayer.relay(&signed).await.unwrap();

        // Identical resubmission dies in pre-flight, so the ledger sees
        // exactly one state-changing call across both attempts.
        assert!(matches!(
            relayer.relay(&signed).await,
            Err(RelayError::NonceReused { .. })
        ));
        assert_eq!(ledger.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn target_revert_maps_to_failed_action_with_record() {
        let (_ledger, relayer) = setup();
        let kp = PorterKeypair::generate();

        let signed = build_signed(&kp, &relayer, 0, vec![0xFF]);
        let err = relayer.relay(&signed).await.unwrap_err();

        let RelayError::TargetActionFailed {
            execution_id,
            reason,
        } = err
        else {
            panic!("expected TargetActionFailed");
        };
        assert_eq!(reason, "PingTarget: refused");
        assert_eq!(execution_id, relayer.execution_id_for(&signed));

        // The failure is durable and the nonce is gone.
        let record = relayer
            .execution_status(execution_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Reverted);
        assert_eq!(relayer.get_nonce(kp.address()).await.unwrap(), U256::one());
    }

    #[tokio::test]
    async fn receipt_serializes_for_the_wire() {
        let (_ledger, relayer) = setup();
        let kp = PorterKeypair::generate();

        let signed = build_signed(&kp, &relayer, 0, vec![0x01]);
        let receipt = relayer.relay(&signed).await.unwrap();

        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json["execution_id"].is_string());
        assert_eq!(json["result"]["success"], serde_json::Value::Bool(true));
        assert_eq!(json["events"][0]["category"], "known_event");
    }

    #[tokio::test]
    async fn status_lookup_for_unknown_id_is_none_not_an_error() {
        let (_ledger, relayer) = setup();
        let missing = H256::from(crate::crypto::keccak256(b"never submitted"));
        assert!(relayer.execution_status(missing).await.unwrap().is_none());
    }
}
