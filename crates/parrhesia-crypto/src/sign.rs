//! ML-DSA-65 digital signatures (FIPS 204).
//!
//! The signing keypair is the only long-lived identity material in the
//! system. Its fingerprint — standard base64 of the public key — doubles
//! as the trust-on-first-use lookup key and the tie-breaker for rekey
//! initiator election, so it must be stable and canonical.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use pqcrypto_mldsa::mldsa65;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// ML-DSA-65 public key length.
pub const SIGNING_PUBLIC_KEY_LEN: usize = 1952;

/// ML-DSA-65 secret key length.
pub const SIGNING_SECRET_KEY_LEN: usize = 4032;

/// ML-DSA-65 detached signature length.
pub const SIGNATURE_LEN: usize = 3309;

/// An ML-DSA-65 public (verification) key.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningPublicKey(Vec<u8>);

impl SigningPublicKey {
    /// Validate and wrap public key bytes.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] unless `bytes` is exactly 1952 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNING_PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidLength {
                what: "signing public key",
                expected: SIGNING_PUBLIC_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Canonical fingerprint: standard base64 (with padding) of the key.
    pub fn fingerprint(&self) -> String {
        BASE64.encode(&self.0)
    }
}

impl std::fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Full keys are noise in logs; a fingerprint prefix is enough.
        let fp = self.fingerprint();
        f.debug_struct("SigningPublicKey").field("fingerprint", &&fp[..16]).finish()
    }
}

/// An ML-DSA-65 secret (signing) key. Zeroized on drop.
#[derive(Clone)]
pub struct SigningSecretKey(Zeroizing<Vec<u8>>);

impl SigningSecretKey {
    /// Validate and wrap secret key bytes.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] unless `bytes` is exactly 4032 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNING_SECRET_KEY_LEN {
            return Err(CryptoError::InvalidLength {
                what: "signing secret key",
                expected: SIGNING_SECRET_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    /// Raw key bytes, for persistence. Callers wrap these before writing
    /// them anywhere.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecretKey").finish_non_exhaustive()
    }
}

/// The long-lived signing identity.
#[derive(Debug, Clone)]
pub struct SigningKeyPair {
    /// Verification key; its base64 is the identity fingerprint.
    pub public: SigningPublicKey,
    /// Signing key, persisted locally (optionally password-wrapped).
    pub secret: SigningSecretKey,
}

impl SigningKeyPair {
    /// Generate a fresh identity from OS entropy.
    pub fn generate() -> Self {
        let (pk, sk) = mldsa65::keypair();
        Self {
            public: SigningPublicKey(pk.as_bytes().to_vec()),
            secret: SigningSecretKey(Zeroizing::new(sk.as_bytes().to_vec())),
        }
    }

    /// Fingerprint of the public half.
    pub fn fingerprint(&self) -> String {
        self.public.fingerprint()
    }
}

/// Produce a detached ML-DSA-65 signature over `message`.
pub fn sign(secret: &SigningSecretKey, message: &[u8]) -> Vec<u8> {
    let Ok(sk) = mldsa65::SecretKey::from_bytes(secret.as_bytes()) else {
        unreachable!("secret key length validated at construction");
    };
    mldsa65::detached_sign(message, &sk).as_bytes().to_vec()
}

/// Verify a detached signature. Returns `false` on any mismatch,
/// including malformed signature bytes.
pub fn verify(public: &SigningPublicKey, message: &[u8], signature: &[u8]) -> bool {
    if signature.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(pk) = mldsa65::PublicKey::from_bytes(public.as_bytes()) else {
        return false;
    };
    let Ok(sig) = mldsa65::DetachedSignature::from_bytes(signature) else {
        return false;
    };
    mldsa65::verify_detached_signature(&sig, message, &pk).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = SigningKeyPair::generate();
        let sig = sign(&kp.secret, b"announce: kem public key");
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(verify(&kp.public, b"announce: kem public key", &sig));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = SigningKeyPair::generate();
        let sig = sign(&kp.secret, b"message a");
        assert!(!verify(&kp.public, b"message b", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let alice = SigningKeyPair::generate();
        let mallory = SigningKeyPair::generate();
        let sig = sign(&mallory.secret, b"payload");
        assert!(!verify(&alice.public, b"payload", &sig));
    }

    #[test]
    fn truncated_signature_fails() {
        let kp = SigningKeyPair::generate();
        let mut sig = sign(&kp.secret, b"payload");
        sig.truncate(SIGNATURE_LEN - 1);
        assert!(!verify(&kp.public, b"payload", &sig));
    }

    #[test]
    fn fingerprint_is_base64_of_public_key() {
        let kp = SigningKeyPair::generate();
        let fp = kp.fingerprint();
        let decoded = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &fp,
        )
        .unwrap();
        assert_eq!(decoded, kp.public.as_bytes());
    }

    #[test]
    fn public_key_length_is_enforced() {
        assert!(SigningPublicKey::from_bytes(&[0u8; 100]).is_err());
    }
}
