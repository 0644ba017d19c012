//! Persisted signing identity.
//!
//! The long-lived ML-DSA-65 keypair is stored as JSON, either raw or
//! wrapped under a password (PBKDF2-SHA-256 over 600 000 iterations
//! deriving an AES-256-GCM key). The storage backend is the shell's
//! concern; this module only speaks strings.

use parrhesia_core::Environment;
use parrhesia_crypto::{
    Password, SALT_LEN, SigningKeyPair, SigningPublicKey, SigningSecretKey, WrappedKey,
    unwrap_key, wrap_key,
};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// On-disk identity shape: password-wrapped or raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredIdentity {
    /// Secret key sealed under a password.
    #[serde(rename_all = "camelCase")]
    Wrapped {
        /// AES-GCM ciphertext over the secret key.
        #[serde(with = "parrhesia_proto::b64")]
        encrypted_key: Vec<u8>,
        /// PBKDF2 salt.
        #[serde(with = "parrhesia_proto::b64")]
        salt: Vec<u8>,
        /// AES-GCM IV.
        #[serde(with = "parrhesia_proto::b64")]
        iv: Vec<u8>,
        /// Signing public key, kept readable for fingerprint display.
        #[serde(with = "parrhesia_proto::b64")]
        public_key: Vec<u8>,
    },
    /// Unprotected keypair.
    Raw {
        /// Signing secret key.
        #[serde(with = "parrhesia_proto::b64")]
        secret_key: Vec<u8>,
        /// Signing public key.
        #[serde(with = "parrhesia_proto::b64")]
        public_key: Vec<u8>,
    },
}

/// Serialize an identity for storage, wrapping it when a password is
/// given.
pub fn store_identity(
    env: &impl Environment,
    identity: &SigningKeyPair,
    password: Option<&Password>,
) -> String {
    let stored = match password {
        Some(password) => {
            let wrapped = wrap_key(
                identity.secret.as_bytes(),
                password,
                env.random_array(),
                env.random_array(),
            );
            StoredIdentity::Wrapped {
                encrypted_key: wrapped.ciphertext,
                salt: wrapped.salt.to_vec(),
                iv: wrapped.iv.to_vec(),
                public_key: identity.public.as_bytes().to_vec(),
            }
        },
        None => StoredIdentity::Raw {
            secret_key: identity.secret.as_bytes().to_vec(),
            public_key: identity.public.as_bytes().to_vec(),
        },
    };

    let Ok(json) = serde_json::to_string(&stored) else {
        unreachable!("identity serialization cannot fail");
    };
    json
}

/// Load a stored identity, unwrapping with `password` where required.
///
/// # Errors
///
/// - [`ClientError::Malformed`] if the JSON matches neither shape
/// - [`ClientError::PasswordRequired`] for a wrapped identity without a
///   password
/// - [`ClientError::InvalidPassword`] if unwrapping fails
/// - [`ClientError::InvalidKey`] if the stored key bytes have the wrong
///   length
pub fn load_identity(
    json: &str,
    password: Option<&Password>,
) -> Result<SigningKeyPair, ClientError> {
    let stored: StoredIdentity =
        serde_json::from_str(json).map_err(|_| ClientError::Malformed { what: "identity" })?;

    match stored {
        StoredIdentity::Raw { secret_key, public_key } => Ok(SigningKeyPair {
            public: SigningPublicKey::from_bytes(&public_key)?,
            secret: SigningSecretKey::from_bytes(&secret_key)?,
        }),
        StoredIdentity::Wrapped { encrypted_key, salt, iv, public_key } => {
            let password = password.ok_or(ClientError::PasswordRequired)?;

            let salt: [u8; SALT_LEN] =
                salt.try_into().map_err(|_| ClientError::Malformed { what: "identity salt" })?;
            let iv: [u8; 12] =
                iv.try_into().map_err(|_| ClientError::Malformed { what: "identity iv" })?;

            let wrapped = WrappedKey { salt, iv, ciphertext: encrypted_key };
            let secret =
                unwrap_key(&wrapped, password).map_err(|_| ClientError::InvalidPassword)?;

            Ok(SigningKeyPair {
                public: SigningPublicKey::from_bytes(&public_key)?,
                secret: SigningSecretKey::from_bytes(&secret)?,
            })
        },
    }
}
