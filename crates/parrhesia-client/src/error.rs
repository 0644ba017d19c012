//! Client-side error type

use thiserror::Error;

/// Errors from persisted client state (identity, history).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The stored identity is password-wrapped and no password was given
    #[error("stored identity requires a password")]
    PasswordRequired,

    /// The password does not unwrap the stored identity or history
    #[error("invalid password")]
    InvalidPassword,

    /// Stored state does not match its schema
    #[error("malformed {what}")]
    Malformed {
        /// What failed to parse
        what: &'static str,
    },

    /// Stored key material has the wrong shape
    #[error("invalid stored key: {0}")]
    InvalidKey(#[from] parrhesia_crypto::CryptoError),
}
