//! AES-256-GCM sealing with an IV-prefixed wire layout.
//!
//! Sealed payloads are `iv ∥ ct ∥ tag`. The caller supplies the 96-bit IV
//! so that protocol code can route all randomness through its environment.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};

use crate::error::CryptoError;

/// AEAD key length (AES-256).
pub const AEAD_KEY_LEN: usize = 32;

/// AEAD IV length (96 bits).
pub const AEAD_IV_LEN: usize = 12;

/// GCM authentication tag length.
pub const AEAD_TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, returning `iv ∥ ct ∥ tag`.
///
/// The IV MUST be fresh for every call under the same key; callers draw it
/// from their environment RNG.
pub fn aead_seal(key: &[u8; AEAD_KEY_LEN], iv: [u8; AEAD_IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&iv), plaintext) else {
        unreachable!("AES-GCM encryption cannot fail for in-memory plaintext sizes");
    };

    let mut sealed = Vec::with_capacity(AEAD_IV_LEN + ciphertext.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&ciphertext);
    sealed
}

/// Decrypt an `iv ∥ ct ∥ tag` payload.
///
/// # Errors
///
/// - [`CryptoError::TruncatedCiphertext`] if the payload is shorter than
///   IV + tag
/// - [`CryptoError::AeadAuth`] on tag mismatch (tampering or wrong key)
pub fn aead_open(key: &[u8; AEAD_KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < AEAD_IV_LEN + AEAD_TAG_LEN {
        return Err(CryptoError::TruncatedCiphertext { actual: sealed.len() });
    }

    let (iv, ciphertext) = sealed.split_at(AEAD_IV_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher.decrypt(Nonce::from_slice(iv), ciphertext).map_err(|_| CryptoError::AeadAuth)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; AEAD_KEY_LEN] = [0x42; AEAD_KEY_LEN];
    const IV: [u8; AEAD_IV_LEN] = [0x07; AEAD_IV_LEN];

    #[test]
    fn seal_open_roundtrip() {
        let sealed = aead_seal(&KEY, IV, b"attack at dawn");
        let opened = aead_open(&KEY, &sealed).unwrap();
        assert_eq!(opened, b"attack at dawn");
    }

    #[test]
    fn sealed_layout_is_iv_then_ciphertext() {
        let sealed = aead_seal(&KEY, IV, b"x");
        assert_eq!(&sealed[..AEAD_IV_LEN], &IV);
        assert_eq!(sealed.len(), AEAD_IV_LEN + 1 + AEAD_TAG_LEN);
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let sealed = aead_seal(&KEY, IV, b"");
        assert_eq!(aead_open(&KEY, &sealed).unwrap(), b"");
    }

    #[test]
    fn wrong_key_fails_auth() {
        let sealed = aead_seal(&KEY, IV, b"secret");
        let wrong = [0x43; AEAD_KEY_LEN];
        assert_eq!(aead_open(&wrong, &sealed), Err(CryptoError::AeadAuth));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let mut sealed = aead_seal(&KEY, IV, b"secret");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(aead_open(&KEY, &sealed), Err(CryptoError::AeadAuth));
    }

    #[test]
    fn truncated_payload_rejected() {
        let result = aead_open(&KEY, &[0u8; AEAD_IV_LEN + AEAD_TAG_LEN - 1]);
        assert_eq!(result, Err(CryptoError::TruncatedCiphertext { actual: 27 }));
    }
}
