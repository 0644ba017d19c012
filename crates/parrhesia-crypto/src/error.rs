//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from the cryptographic primitive layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key, ciphertext, or signature bytes have the wrong length
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        /// What kind of material was malformed
        what: &'static str,
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// KEM decapsulation rejected the ciphertext
    ///
    /// ML-KEM uses implicit rejection, so this only fires on structurally
    /// malformed input. Callers must not rely on it for authentication.
    #[error("KEM decapsulation failed")]
    Decapsulation,

    /// AEAD authentication tag mismatch (tampering or wrong key)
    #[error("AEAD authentication failed")]
    AeadAuth,

    /// Sealed payload shorter than IV + tag
    #[error("sealed payload truncated: {actual} bytes")]
    TruncatedCiphertext {
        /// Actual payload length
        actual: usize,
    },

    /// Password-based unwrap failed (wrong password or corrupted blob)
    #[error("password unwrap failed")]
    PasswordUnwrap,
}
