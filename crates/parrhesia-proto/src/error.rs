//! Protocol error type

use thiserror::Error;

/// Errors from frame or tree-operation (de)serialization.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame or embedded document is not valid JSON for its schema
    #[error("malformed {what}: {source}")]
    Malformed {
        /// What was being decoded
        what: &'static str,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// A base64 field failed to decode
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ProtocolError {
    pub(crate) fn malformed(what: &'static str, source: serde_json::Error) -> Self {
        Self::Malformed { what, source }
    }
}
