//! # Pre-Flight Verification
//!
//! The [`Verifier`] re-derives a signed request's payload and checks the
//! two things a relayer can check before paying for a submission: does
//! the signature recover to the declared signer, and does the nonce
//! match the ledger's current expectation.
//!
//! Both answers are **advisory**. A pass here is a snapshot, not a
//! reservation — another submission can consume the nonce between this
//! check and the real one. The ledger's atomic verify-and-execute is the
//! only verdict that counts; this module exists so a relayer can decline
//! obviously-doomed requests without spending a ledger round trip on
//! them.

use std::sync::Arc;

use crate::crypto::recover_signer;
use crate::forward::{codec, ForwardRequest, SignedForwardRequest, SigningDomain};
use crate::ledger::Ledger;

use super::error::RelayError;

/// Stateless pre-flight checks over one signing domain and one ledger.
#[derive(Clone)]
pub struct Verifier {
    domain: SigningDomain,
    ledger: Arc<dyn Ledger>,
}

impl Verifier {
    pub fn new(domain: SigningDomain, ledger: Arc<dyn Ledger>) -> Self {
        Self { domain, ledger }
    }

    /// Checks that the signature recovers to `request.from` over the
    /// domain-separated payload this verifier would itself derive.
    ///
    /// Purely local: hashing and curve arithmetic, no I/O.
    pub fn check_signature(&self, signed: &SignedForwardRequest) -> Result<(), RelayError> {
        let digest = codec::signing_payload(&self.domain, &signed.request);
        match recover_signer(digest, signed.signature.as_ref()) {
            Some(recovered) if recovered == signed.request.from => Ok(()),
            recovered => Err(RelayError::SignatureMismatch {
                expected: signed.request.from,
                recovered,
            }),
        }
    }

    /// Checks the request nonce against the ledger's stored next-nonce.
    /// A mismatch now will be a mismatch at execution too, barring an
    /// interleaved submission; a match now guarantees nothing.
    pub async fn check_nonce(&self, request: &ForwardRequest) -> Result<(), RelayError> {
        let expected = self
            .ledger
            .get_nonce(request.from)
            .await
            .map_err(RelayError::ledger_read)?;
        if request.nonce != expected {
            return Err(RelayError::NonceReused {
                signer: request.from,
                expected,
                got: request.nonce,
            });
        }
        Ok(())
    }

    /// Full pre-flight: signature first (local, cheap to fail), then the
    /// nonce read (a ledger round trip).
    pub async fn verify(&self, signed: &SignedForwardRequest) -> Result<(), RelayError> {
        self.check_signature(signed)?;
        self.check_nonce(&signed.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GAS_CEILING;
    use crate::crypto::PorterKeypair;
    use crate::ledger::DevLedger;
    use ethers::types::{Address, Bytes, U256};

    fn setup() -> (Arc<DevLedger>, SigningDomain, Verifier) {
        let domain = SigningDomain::devnet(Address::from_low_u64_be(0xF0));
        let ledger = Arc::new(DevLedger::new(domain.clone()));
        let verifier = Verifier::new(domain.clone(), ledger.clone());
        (ledger, domain, verifier)
    }

    fn signed_request(
        kp: &PorterKeypair,
        domain: &SigningDomain,
        nonce: u64,
    ) -> SignedForwardRequest {
        let request = ForwardRequest {
            from: kp.address(),
            to: Address::from_low_u64_be(0xEC40),
            value: U256::zero(),
            gas: U256::from(DEFAULT_GAS_CEILING),
            nonce: U256::from(nonce),
            data: Bytes::from(vec![0x01]),
        };
        let sig = kp.sign_digest(codec::signing_payload(domain, &request)).unwrap();
        SignedForwardRequest::new(request, &sig)
    }

    #[tokio::test]
    async fn accepts_a_well_signed_current_request() {
        let (_ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();
        let signed = signed_request(&kp, &domain, 0);
        assert!(verifier.verify(&signed).await.is_ok());
    }

    #[tokio::test]
    async fn tampered_request_fails_signature_check() {
        let (_ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();

        let mut signed = signed_request(&kp, &domain, 0);
        // Flip the value after signing. Recovery now lands elsewhere.
        signed.request.value = U256::from(1u64);

        let err = verifier.check_signature(&signed).unwrap_err();
        match err {
            RelayError::SignatureMismatch {
                expected,
                recovered,
            } => {
                assert_eq!(expected, kp.address());
                assert!(recovered.is_some());
                assert_ne!(recovered, Some(kp.address()));
            }
            other => panic!("expected SignatureMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_signature_bytes_recover_to_nothing() {
        let (_ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();

        let mut signed = signed_request(&kp, &domain, 0);
        signed.signature = Bytes::from(vec![0x00; 12]);

        assert!(matches!(
            verifier.check_signature(&signed),
            Err(RelayError::SignatureMismatch {
                recovered: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn stale_nonce_is_flagged_before_submission() {
        let (_ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();

        let signed = signed_request(&kp, &domain, 4);
        let err = verifier.verify(&signed).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::NonceReused { expected, got, .. }
                if expected == U256::zero() && got == U256::from(4u64)
        ));
    }

    #[tokio::test]
    async fn unreachable_ledger_surfaces_as_unavailable() {
        let (ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();
        let signed = signed_request(&kp, &domain, 0);

        ledger.set_offline(true);
        assert!(matches!(
            verifier.verify(&signed).await,
            Err(RelayError::LedgerUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn a_pass_is_a_snapshot_not_a_reservation() {
        let (ledger, domain, verifier) = setup();
        let kp = PorterKeypair::generate();
        let signed = signed_request(&kp, &domain, 0);

        assert!(verifier.verify(&signed).await.is_ok());

        // Someone else lands the nonce between pre-flight and submission.
        ledger.verify_and_execute(&signed).await.unwrap();

        assert!(matches!(
            verifier.verify(&signed).await,
            Err(RelayError::NonceReused { .. })
        ));
    }
}
