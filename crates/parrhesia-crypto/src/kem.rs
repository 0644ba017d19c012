//! ML-KEM-768 key encapsulation (FIPS 203).
//!
//! Keys are held as length-validated byte buffers and reconstructed into
//! the underlying implementation types at call sites. Secret keys are
//! zeroized on drop; they exist only for the lifetime of a session and
//! are never persisted.

use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// ML-KEM-768 public key length.
pub const KEM_PUBLIC_KEY_LEN: usize = 1184;

/// ML-KEM-768 secret key length.
pub const KEM_SECRET_KEY_LEN: usize = 2400;

/// ML-KEM-768 ciphertext length.
pub const KEM_CIPHERTEXT_LEN: usize = 1088;

/// KEM shared secret length.
pub const SHARED_SECRET_LEN: usize = 32;

/// A 32-byte KEM shared secret, zeroized on drop.
pub type SharedSecret = Zeroizing<[u8; SHARED_SECRET_LEN]>;

/// An ML-KEM-768 public key (encapsulation key).
#[derive(Clone, PartialEq, Eq)]
pub struct KemPublicKey(Vec<u8>);

impl KemPublicKey {
    /// Validate and wrap public key bytes.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] unless `bytes` is exactly 1184 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEM_PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidLength {
                what: "KEM public key",
                expected: KEM_PUBLIC_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for KemPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemPublicKey").field("len", &self.0.len()).finish()
    }
}

/// An ML-KEM-768 secret key (decapsulation key). Zeroized on drop.
#[derive(Clone)]
pub struct KemSecretKey(Zeroizing<Vec<u8>>);

impl KemSecretKey {
    /// Validate and wrap secret key bytes.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] unless `bytes` is exactly 2400 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEM_SECRET_KEY_LEN {
            return Err(CryptoError::InvalidLength {
                what: "KEM secret key",
                expected: KEM_SECRET_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    /// Decapsulate a ciphertext into the shared secret.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] on a malformed ciphertext length;
    /// [`CryptoError::Decapsulation`] if the implementation rejects the
    /// input. ML-KEM uses implicit rejection — a structurally valid but
    /// forged ciphertext still yields a (useless) secret, so callers must
    /// never treat success as authentication.
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<SharedSecret, CryptoError> {
        if ciphertext.len() != KEM_CIPHERTEXT_LEN {
            return Err(CryptoError::InvalidLength {
                what: "KEM ciphertext",
                expected: KEM_CIPHERTEXT_LEN,
                actual: ciphertext.len(),
            });
        }

        let ct =
            mlkem768::Ciphertext::from_bytes(ciphertext).map_err(|_| CryptoError::Decapsulation)?;
        let sk = mlkem768::SecretKey::from_bytes(&self.0).map_err(|_| CryptoError::Decapsulation)?;
        let ss = mlkem768::decapsulate(&ct, &sk);

        let mut out = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
        out.copy_from_slice(ss.as_bytes());
        Ok(out)
    }
}

impl std::fmt::Debug for KemSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemSecretKey").finish_non_exhaustive()
    }
}

/// An ephemeral ML-KEM-768 keypair.
#[derive(Debug, Clone)]
pub struct KemKeyPair {
    /// Encapsulation key, announced to peers.
    pub public: KemPublicKey,
    /// Decapsulation key, process-local and never persisted.
    pub secret: KemSecretKey,
}

impl KemKeyPair {
    /// Generate a fresh keypair from OS entropy.
    pub fn generate() -> Self {
        let (pk, sk) = mlkem768::keypair();
        Self {
            public: KemPublicKey(pk.as_bytes().to_vec()),
            secret: KemSecretKey(Zeroizing::new(sk.as_bytes().to_vec())),
        }
    }
}

/// Encapsulate to a peer's public key.
///
/// Returns the 1088-byte ciphertext and the 32-byte shared secret.
pub fn encapsulate(public: &KemPublicKey) -> Result<(Vec<u8>, SharedSecret), CryptoError> {
    let pk = mlkem768::PublicKey::from_bytes(&public.0).map_err(|_| CryptoError::InvalidLength {
        what: "KEM public key",
        expected: KEM_PUBLIC_KEY_LEN,
        actual: public.0.len(),
    })?;

    let (ss, ct) = mlkem768::encapsulate(&pk);

    let mut out = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    out.copy_from_slice(ss.as_bytes());
    Ok((ct.as_bytes().to_vec(), out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_advertised_lengths() {
        let kp = KemKeyPair::generate();
        assert_eq!(kp.public.as_bytes().len(), KEM_PUBLIC_KEY_LEN);
    }

    #[test]
    fn encap_decap_agree() {
        let kp = KemKeyPair::generate();
        let (ct, ss_sender) = encapsulate(&kp.public).unwrap();
        assert_eq!(ct.len(), KEM_CIPHERTEXT_LEN);

        let ss_receiver = kp.secret.decapsulate(&ct).unwrap();
        assert_eq!(*ss_sender, *ss_receiver);
    }

    #[test]
    fn decap_with_wrong_key_disagrees() {
        let alice = KemKeyPair::generate();
        let mallory = KemKeyPair::generate();

        let (ct, ss_sender) = encapsulate(&alice.public).unwrap();
        // Implicit rejection: decapsulation succeeds but yields garbage.
        let ss_mallory = mallory.secret.decapsulate(&ct).unwrap();
        assert_ne!(*ss_sender, *ss_mallory);
    }

    #[test]
    fn public_key_length_is_enforced() {
        let result = KemPublicKey::from_bytes(&[0u8; KEM_PUBLIC_KEY_LEN - 1]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidLength { what: "KEM public key", .. })
        ));
    }

    #[test]
    fn secret_key_length_is_enforced() {
        let result = KemSecretKey::from_bytes(&[0u8; 32]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidLength { what: "KEM secret key", .. })
        ));
    }

    #[test]
    fn ciphertext_length_is_enforced() {
        let kp = KemKeyPair::generate();
        let result = kp.secret.decapsulate(&[0u8; 64]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidLength { what: "KEM ciphertext", .. })
        ));
    }
}
