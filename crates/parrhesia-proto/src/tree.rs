//! Tree operation documents.
//!
//! [`Commit`] and [`Welcome`] are JSON documents embedded as strings in
//! their carrier frames. Node indices use the array representation of a
//! left-balanced binary tree: leaf `p` is node `2p`, odd indices are
//! internal nodes.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, b64};

/// One rotated node on the committer's direct path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPathNode {
    /// Index of the rotated node.
    pub node_index: u32,
    /// Fresh KEM public key installed at this node.
    #[serde(with = "b64")]
    pub new_pk: Vec<u8>,
    /// KEM ciphertext to the copath resolution, or `null` when the copath
    /// subtree is empty (its occupants are welcomed instead).
    #[serde(with = "b64::opt", default)]
    pub kem_ct: Option<Vec<u8>>,
    /// Node secret sealed under the KEM shared secret, or `null` alongside
    /// `kem_ct`.
    #[serde(with = "b64::opt", default)]
    pub aead_ct: Option<Vec<u8>>,
}

/// A key-rotation commit: the committer rotates its leaf and every node
/// on its direct path, encapsulating each new node secret to the copath.
///
/// Accepted atomically by every member; advances the epoch by exactly
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// The committer's leaf position.
    pub committer_leaf_pos: u32,
    /// The committer's fresh leaf KEM public key.
    #[serde(with = "b64")]
    pub new_leaf_pk: Vec<u8>,
    /// Rotated path nodes, ordered leaf to root.
    pub path: Vec<CommitPathNode>,
    /// The epoch this commit establishes (previous epoch + 1).
    pub epoch: u64,
}

/// One path secret delivered to a joiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomePathSecret {
    /// Index of the node this secret belongs to.
    pub node_index: u32,
    /// KEM ciphertext to the joiner's announced public key.
    #[serde(with = "b64")]
    pub kem_ct: Vec<u8>,
    /// Node secret sealed under the KEM shared secret.
    #[serde(with = "b64")]
    pub aead_ct: Vec<u8>,
}

/// A targeted welcome: everything a joiner needs to reconstruct the tree
/// at a given epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    /// Public key of every node, `null` where blank, indexed by node.
    #[serde(with = "b64::seq_opt")]
    pub tree_public_keys: Vec<Option<Vec<u8>>>,
    /// Leaf count of the tree.
    pub num_leaves: u32,
    /// The joiner's assigned leaf position.
    pub my_leaf_pos: u32,
    /// Path secrets, lowest node first. The first entry is the joiner's
    /// entry point; later entries are redundant.
    pub path_secrets: Vec<WelcomePathSecret>,
    /// The epoch the joiner lands in.
    pub epoch: u64,
}

impl Commit {
    /// Encode as the embedded JSON document.
    pub fn encode(&self) -> String {
        let Ok(json) = serde_json::to_string(self) else {
            unreachable!("commit serialization cannot fail");
        };
        json
    }

    /// Decode an embedded commit document.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the JSON does not match the schema.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::malformed("commit", e))
    }
}

impl Welcome {
    /// Encode as the embedded JSON document.
    pub fn encode(&self) -> String {
        let Ok(json) = serde_json::to_string(self) else {
            unreachable!("welcome serialization cannot fail");
        };
        json
    }

    /// Decode an embedded welcome document.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the JSON does not match the schema.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::malformed("welcome", e))
    }
}
