//! Error types for the Parrhesia protocol core.
//!
//! Strongly-typed errors per layer: tree operations, sender chains, and
//! the group key manager. The manager's [`GroupError`] is the taxonomy
//! the session layer acts on; its `is_fatal()` split decides between
//! dropping a frame and tearing the session down.

use parrhesia_crypto::CryptoError;
use thiserror::Error;

/// Errors from TreeKEM tree operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Commit epoch is not exactly current + 1
    #[error("stale commit: at epoch {current}, received {received}")]
    StaleCommit {
        /// Local epoch
        current: u64,
        /// Epoch carried by the rejected commit
        received: u64,
    },

    /// The tree is at its membership limit
    #[error("tree full: {max} leaves")]
    TreeFull {
        /// Maximum leaf count
        max: usize,
    },

    /// Leaf position outside the current tree
    #[error("leaf {leaf} out of range: tree has {num_leaves} leaves")]
    LeafOutOfRange {
        /// Requested leaf position
        leaf: usize,
        /// Current leaf count
        num_leaves: usize,
    },

    /// No commit path entry is decryptable from this leaf
    ///
    /// The local tree disagrees with the committer's view; only a fresh
    /// welcome can recover.
    #[error("no usable entry point in commit path")]
    NoEntryPoint,

    /// No secret is known on the joiner's direct path
    #[error("no path secret available for welcome")]
    NoPathSecret,

    /// Structurally invalid operation document
    #[error("malformed tree operation: {0}")]
    Malformed(&'static str),

    /// Underlying primitive failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from per-sender chain operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Counter below the chain position and not in the skipped cache
    #[error("counter {counter} below chain position and not cached")]
    OutOfOrder {
        /// The unrecoverable counter
        counter: u64,
    },

    /// Counter implausibly far ahead of the chain position
    #[error("counter {requested} too far ahead of {current}")]
    CounterJump {
        /// Requested counter
        requested: u64,
        /// Current chain position
        current: u64,
    },

    /// No chain exists for this sender
    #[error("unknown sender: {peer_id}")]
    UnknownSender {
        /// The sender without a chain
        peer_id: String,
    },
}

/// Errors from the group key manager.
///
/// Non-fatal errors mean "drop this frame and carry on"; fatal errors
/// tear down the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// A peer announced key material with the wrong length
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidKey {
        /// Which key was malformed
        what: &'static str,
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// The announcement signature does not cover the KEM public key
    #[error("invalid signature over announced KEM key")]
    InvalidSignature,

    /// The fingerprint is already bound to a different identity
    #[error("trust conflict for fingerprint {fingerprint}: bound to {bound_peer_id}")]
    TofuConflict {
        /// The conflicting fingerprint
        fingerprint: String,
        /// The peer the fingerprint was first seen as
        bound_peer_id: String,
    },

    /// A commit or welcome could not be decapsulated
    #[error("KEM decapsulation failed processing a tree operation")]
    KemDecapFailure,

    /// Message authentication failed
    #[error("message failed AEAD authentication")]
    AeadAuthFailure,

    /// Commit epoch is not exactly current + 1
    #[error("stale commit: at epoch {current}, received {received}")]
    StaleCommit {
        /// Local epoch
        current: u64,
        /// Epoch carried by the rejected commit
        received: u64,
    },

    /// Message epoch outside the current epoch and grace window
    #[error("epoch {received} outside window at epoch {current}")]
    EpochOutOfWindow {
        /// Local epoch
        current: u64,
        /// Epoch carried by the rejected message
        received: u64,
    },

    /// Message counter unrecoverably behind its chain
    #[error("message counter {counter} out of order")]
    OutOfOrder {
        /// The unrecoverable counter
        counter: u64,
    },

    /// No record of this peer
    #[error("unknown peer: {peer_id}")]
    UnknownPeer {
        /// The unknown peer id
        peer_id: String,
    },

    /// The room is at its membership limit
    #[error("room full: {max} members")]
    RoomFull {
        /// Maximum member count
        max: usize,
    },

    /// No group key has been established yet
    #[error("group key not yet established")]
    NotEstablished,

    /// The local tree is in an inconsistent state
    #[error("rekey failed: {reason}")]
    RekeyFailed {
        /// What went wrong
        reason: String,
    },
}

impl GroupError {
    /// True if this error is unrecoverable and the session must end.
    ///
    /// Everything else is drop-and-continue: the offending frame is
    /// discarded and the protocol state is unchanged.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RekeyFailed { .. })
    }
}

impl From<TreeError> for GroupError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::StaleCommit { current, received } => Self::StaleCommit { current, received },
            TreeError::TreeFull { max } => Self::RoomFull { max },
            TreeError::Crypto(CryptoError::AeadAuth | CryptoError::Decapsulation) => {
                Self::KemDecapFailure
            },
            TreeError::NoEntryPoint
            | TreeError::NoPathSecret
            | TreeError::LeafOutOfRange { .. }
            | TreeError::Malformed(_)
            | TreeError::Crypto(_) => Self::RekeyFailed { reason: err.to_string() },
        }
    }
}

impl From<ChainError> for GroupError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::OutOfOrder { counter } => Self::OutOfOrder { counter },
            ChainError::CounterJump { requested, .. } => Self::OutOfOrder { counter: requested },
            ChainError::UnknownSender { peer_id } => Self::UnknownPeer { peer_id },
        }
    }
}
