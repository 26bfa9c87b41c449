//! # Request Building
//!
//! The [`RequestBuilder`] turns a caller's intent — "invoke this target
//! with these bytes" — into a fully-populated [`ForwardRequest`] plus
//! everything a wallet needs to sign it: the 32-byte signing payload and
//! the structured typed-data document.
//!
//! The builder is the only pipeline stage that reads the ledger before
//! signing: it fetches the signer's current nonce so the request binds
//! to a specific position in the signer's sequence. Everything else is
//! defaulting and validation. It never touches key material and never
//! submits anything.

use std::sync::Arc;

use ethers::types::{Address, H256, U256};

use crate::config::{DEFAULT_GAS_CEILING, MAX_CALLDATA_BYTES, MAX_GAS_CEILING};
use crate::ledger::Ledger;
use crate::relay::RelayError;

use super::codec;
use super::types::{ForwardRequest, SigningDomain, TargetCall};

/// A request ready to be signed, with both renderings of its payload.
///
/// `signing_payload` is what actually gets signed; `typed_data` is the
/// same payload as the structured document wallets display for human
/// review. They are derived from the same request by the same codec —
/// a signer can recompute the digest from the document and check the
/// two agree before signing anything.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: ForwardRequest,
    pub signing_payload: H256,
    pub typed_data: serde_json::Value,
}

impl PreparedRequest {
    /// Hex rendering of the signing payload, for display and logging.
    pub fn payload_hex(&self) -> String {
        format!("{:#x}", self.signing_payload)
    }
}

/// Builds signable forward requests for one domain against one ledger.
pub struct RequestBuilder {
    domain: SigningDomain,
    ledger: Arc<dyn Ledger>,
    gas_ceiling: U256,
}

impl RequestBuilder {
    pub fn new(domain: SigningDomain, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            domain,
            ledger,
            gas_ceiling: U256::from(DEFAULT_GAS_CEILING),
        }
    }

    /// Overrides the default gas budget stamped on requests that don't
    /// carry their own. Still subject to the hard ceiling at build time.
    pub fn with_gas_ceiling(mut self, gas_ceiling: U256) -> Self {
        self.gas_ceiling = gas_ceiling;
        self
    }

    /// The domain every built request will be bound to.
    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// Assembles a signable request for `signer` invoking `call`.
    ///
    /// Missing `value` defaults to zero; missing `gas` defaults to the
    /// builder's ceiling. The nonce is read fresh from the ledger on
    /// every build — nothing is cached, so two builds for the same
    /// signer without an execution in between produce the same nonce,
    /// and only one of the resulting signatures can ever land.
    pub async fn build(
        &self,
        signer: Address,
        call: TargetCall,
    ) -> Result<PreparedRequest, RelayError> {
        if signer == Address::zero() {
            return Err(RelayError::malformed("signer is the zero address"));
        }
        if call.data.len() > MAX_CALLDATA_BYTES {
            return Err(RelayError::malformed(format!(
                "calldata is {} bytes, limit is {}",
                call.data.len(),
                MAX_CALLDATA_BYTES
            )));
        }

        let gas = call.gas.unwrap_or(self.gas_ceiling);
        if gas.is_zero() {
            return Err(RelayError::malformed("gas budget is zero"));
        }
        if gas > U256::from(MAX_GAS_CEILING) {
            return Err(RelayError::malformed(format!(
                "gas budget {} exceeds the hard ceiling {}",
                gas, MAX_GAS_CEILING
            )));
        }

        let nonce = self
            .ledger
            .get_nonce(signer)
            .await
            .map_err(RelayError::ledger_read)?;

        let request = ForwardRequest {
            from: signer,
            to: call.to,
            value: call.value.unwrap_or_default(),
            gas,
            nonce,
            data: call.data,
        };

        let signing_payload = codec::signing_payload(&self.domain, &request);
        let typed_data = codec::typed_data(&self.domain, &request);

        Ok(PreparedRequest {
            request,
            signing_payload,
            typed_data,
        })
    }
}
