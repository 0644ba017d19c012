//! Encrypted message history.
//!
//! History is a JSON array of message records, optionally sealed under a
//! key derived from the user's password. The sealing key is independent
//! from the identity wrapping key: the password is suffixed with
//! `"-messages"` and the salt is fresh, so neither blob helps open the
//! other.

use parrhesia_core::Environment;
use parrhesia_crypto::{Password, SALT_LEN, aead_open, aead_seal, derive_wrapping_key};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Password suffix domain-separating the history key.
const HISTORY_SUFFIX: &str = "-messages";

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Sender's peer id.
    pub peer_id: String,
    /// Correlation id, if one was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Message text.
    pub body: String,
    /// Epoch the message was sent under.
    pub epoch: u64,
    /// Sender chain counter.
    pub counter: u64,
    /// Unix seconds at receipt.
    pub timestamp: u64,
    /// True if this client sent the message.
    pub outgoing: bool,
}

/// Sealed history blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedHistory {
    #[serde(with = "parrhesia_proto::b64")]
    salt: Vec<u8>,
    /// `iv ∥ ct ∥ tag` over the JSON record array.
    #[serde(with = "parrhesia_proto::b64")]
    payload: Vec<u8>,
}

/// Seal a history under `password`, returning the storage JSON.
pub fn seal_history(
    env: &impl Environment,
    records: &[MessageRecord],
    password: &Password,
) -> String {
    let Ok(plaintext) = serde_json::to_vec(records) else {
        unreachable!("record serialization cannot fail");
    };

    let salt: [u8; SALT_LEN] = env.random_array();
    let key = derive_wrapping_key(&password.with_suffix(HISTORY_SUFFIX), &salt);
    let payload = aead_seal(&key, env.random_array(), &plaintext);

    let Ok(json) = serde_json::to_string(&SealedHistory { salt: salt.to_vec(), payload }) else {
        unreachable!("blob serialization cannot fail");
    };
    json
}

/// Open a sealed history blob.
///
/// # Errors
///
/// - [`ClientError::Malformed`] if the blob or inner array does not
///   parse
/// - [`ClientError::InvalidPassword`] if authentication fails
pub fn open_history(json: &str, password: &Password) -> Result<Vec<MessageRecord>, ClientError> {
    let sealed: SealedHistory =
        serde_json::from_str(json).map_err(|_| ClientError::Malformed { what: "history blob" })?;
    let salt: [u8; SALT_LEN] = sealed
        .salt
        .as_slice()
        .try_into()
        .map_err(|_| ClientError::Malformed { what: "history salt" })?;

    let key = derive_wrapping_key(&password.with_suffix(HISTORY_SUFFIX), &salt);
    let plaintext =
        aead_open(&key, &sealed.payload).map_err(|_| ClientError::InvalidPassword)?;

    serde_json::from_slice(&plaintext).map_err(|_| ClientError::Malformed { what: "history records" })
}
