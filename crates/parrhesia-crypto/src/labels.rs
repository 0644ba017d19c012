//! Domain-separation labels for every HKDF derivation.
//!
//! Each derivation in the key hierarchy uses a distinct ASCII info string
//! so that no two contexts can ever produce the same output from the same
//! input keying material.

/// Derives a tree node secret from its child's secret.
pub const TREE_NODE: &[u8] = b"parrhesia-tree-node";

/// Derives the 256-bit group key from the tree root secret.
pub const TREE_ROOT: &[u8] = b"parrhesia-tree-root";

/// Derives the AEAD key that wraps a path secret under a KEM shared
/// secret.
pub const KEM_WRAP: &[u8] = b"parrhesia-kem-v2";

/// Prefix for per-sender chain seeding; the sender's peer id is appended.
pub const CHAIN_PREFIX: &[u8] = b"parrhesia-chain-";

/// Derives a one-time message key from a chain key.
pub const CHAIN_MSG: &[u8] = b"msg";

/// Derives the next chain key from the current chain key.
pub const CHAIN_STEP: &[u8] = b"chain";
