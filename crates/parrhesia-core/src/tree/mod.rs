//! TreeKEM group key agreement.
//!
//! A left-balanced binary tree of ephemeral ML-KEM-768 keypairs whose
//! root secret is the group's shared secret. Members rotate keys by
//! committing: the committer draws a fresh leaf secret, derives a chain
//! of secrets up its direct path, and encapsulates each path secret to
//! the resolution of the corresponding copath subtree. Joiners are
//! initialized by a targeted welcome instead.
//!
//! # Invariants
//!
//! - A node is "blank" when it holds no public key; blank nodes hold no
//!   secret material either.
//! - A node secret equals HKDF(child secret, `"parrhesia-tree-node"`) at
//!   derivation time; the root secret feeds the group key derivation.
//! - The epoch advances by exactly one per successful commit; a commit
//!   whose epoch is not exactly `current + 1` is rejected unapplied.
//! - Removing a leaf blanks it permanently: `num_leaves` never
//!   decreases and existing leaves are never renumbered.

pub mod math;

use parrhesia_crypto::{
    KemKeyPair, KemPublicKey, aead_open, aead_seal, derive_key, encapsulate, labels,
};
use parrhesia_proto::{Commit, CommitPathNode, Welcome, WelcomePathSecret};
use zeroize::Zeroizing;

use crate::{env::Environment, error::TreeError};

/// Maximum number of leaves (room capacity).
pub const MAX_LEAVES: usize = 16;

/// A 32-byte node secret, zeroized on drop.
type NodeSecret = Zeroizing<[u8; 32]>;

/// One tree node: any field may be blank.
#[derive(Debug, Clone, Default)]
struct Node {
    public_key: Option<KemPublicKey>,
    secret_key: Option<parrhesia_crypto::KemSecretKey>,
    secret: Option<NodeSecret>,
}

impl Node {
    fn blank(&mut self) {
        self.public_key = None;
        self.secret_key = None;
        self.secret = None;
    }

    fn is_blank(&self) -> bool {
        self.public_key.is_none()
    }
}

/// Local TreeKEM state for one group member.
#[derive(Debug, Clone)]
pub struct TreeKem {
    nodes: Vec<Node>,
    num_leaves: usize,
    my_leaf: usize,
    epoch: u64,
}

impl TreeKem {
    /// Create a one-leaf tree for the room creator.
    ///
    /// The single leaf is also the root; its secret is 32 fresh random
    /// bytes, so the creator has a group key while alone.
    pub fn create_for_creator(env: &impl Environment, kem: &KemKeyPair) -> Self {
        let mut leaf = Node {
            public_key: Some(kem.public.clone()),
            secret_key: Some(kem.secret.clone()),
            secret: None,
        };
        leaf.secret = Some(Zeroizing::new(env.random_array()));

        Self { nodes: vec![leaf], num_leaves: 1, my_leaf: 0, epoch: 0 }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Leaf count, including permanently blanked slots.
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// This member's leaf position.
    pub fn my_leaf(&self) -> usize {
        self.my_leaf
    }

    /// The current root secret.
    ///
    /// # Errors
    ///
    /// [`TreeError::NoPathSecret`] if no secret has been established yet
    /// (only possible between construction and the first derivation).
    pub fn root_secret(&self) -> Result<&[u8; 32], TreeError> {
        let r = math::root(self.num_leaves);
        self.nodes[r].secret.as_deref().ok_or(TreeError::NoPathSecret)
    }

    /// Append a leaf for a new member.
    ///
    /// Blanks every node on the new leaf's direct path (their secrets no
    /// longer cover the whole subtree). Returns the new leaf position.
    ///
    /// # Errors
    ///
    /// [`TreeError::TreeFull`] at [`MAX_LEAVES`] leaves.
    pub fn add_leaf(&mut self, public_key: KemPublicKey) -> Result<usize, TreeError> {
        if self.num_leaves >= MAX_LEAVES {
            return Err(TreeError::TreeFull { max: MAX_LEAVES });
        }

        let pos = self.num_leaves;
        self.num_leaves += 1;
        self.nodes.resize_with(math::node_width(self.num_leaves), Node::default);

        self.nodes[2 * pos].public_key = Some(public_key);
        for x in math::direct_path(pos, self.num_leaves) {
            self.nodes[x].blank();
        }
        Ok(pos)
    }

    /// Blank a departed member's leaf and its direct path.
    ///
    /// The slot stays blank forever; `num_leaves` is not decremented so
    /// that no existing leaf is renumbered.
    ///
    /// # Errors
    ///
    /// [`TreeError::LeafOutOfRange`] for a position outside the tree.
    pub fn remove_leaf(&mut self, pos: usize) -> Result<(), TreeError> {
        if pos >= self.num_leaves {
            return Err(TreeError::LeafOutOfRange { leaf: pos, num_leaves: self.num_leaves });
        }

        self.nodes[2 * pos].blank();
        for x in math::direct_path(pos, self.num_leaves) {
            self.nodes[x].blank();
        }
        Ok(())
    }

    /// Resolution of a node: the node itself if non-blank, otherwise its
    /// leftmost non-blank descendant.
    fn resolve(&self, x: usize) -> Option<usize> {
        if !self.nodes[x].is_blank() {
            return Some(x);
        }
        if math::level(x) == 0 {
            return None;
        }
        self.resolve(math::left_child(x))
            .or_else(|| self.resolve(math::right_child(x, self.num_leaves)))
    }

    /// Rotate this member's leaf and direct path, producing a commit for
    /// the rest of the group. Advances the local epoch.
    ///
    /// For each rotated path node, the new secret is encapsulated to the
    /// resolution of the corresponding copath subtree; an empty copath
    /// subtree yields an empty entry (its future occupants are welcomed
    /// instead).
    pub fn generate_commit(&mut self, env: &impl Environment) -> Result<Commit, TreeError> {
        let n = self.num_leaves;
        let leaf = 2 * self.my_leaf;

        // Fresh leaf secret and keypair.
        let leaf_kem = KemKeyPair::generate();
        let leaf_secret: NodeSecret = Zeroizing::new(env.random_array());
        self.nodes[leaf].public_key = Some(leaf_kem.public.clone());
        self.nodes[leaf].secret_key = Some(leaf_kem.secret.clone());
        self.nodes[leaf].secret = Some(leaf_secret.clone());

        // Derive the path secret chain and install fresh keypairs.
        let path = math::direct_path(self.my_leaf, n);
        let copath = math::copath(self.my_leaf, n);

        let mut entries = Vec::with_capacity(path.len());
        let mut prev = leaf_secret;
        for (&x, &sib) in path.iter().zip(&copath) {
            let secret: NodeSecret = derive_key(prev.as_ref(), labels::TREE_NODE);
            let node_kem = KemKeyPair::generate();
            let new_pk = node_kem.public.as_bytes().to_vec();

            self.nodes[x].public_key = Some(node_kem.public);
            self.nodes[x].secret_key = Some(node_kem.secret);
            self.nodes[x].secret = Some(secret.clone());

            let (kem_ct, aead_ct) = match self.resolve(sib) {
                Some(target) => {
                    let target_pk = self.nodes[target]
                        .public_key
                        .as_ref()
                        .unwrap_or_else(|| unreachable!("resolved nodes have public keys"));
                    let (ct, ss) = encapsulate(target_pk)?;
                    let wrap = derive_key(ss.as_ref(), labels::KEM_WRAP);
                    let sealed = aead_seal(&wrap, env.random_array(), secret.as_ref());
                    (Some(ct), Some(sealed))
                },
                None => (None, None),
            };

            entries.push(CommitPathNode { node_index: x as u32, new_pk, kem_ct, aead_ct });

            prev = secret;
        }

        self.epoch += 1;
        Ok(Commit {
            committer_leaf_pos: self.my_leaf as u32,
            new_leaf_pk: leaf_kem.public.as_bytes().to_vec(),
            path: entries,
            epoch: self.epoch,
        })
    }

    /// Apply another member's commit. Returns the new root secret.
    ///
    /// Applied transactionally: on any error the tree is unchanged.
    ///
    /// # Errors
    ///
    /// - [`TreeError::StaleCommit`] unless `commit.epoch == current + 1`
    /// - [`TreeError::NoEntryPoint`] if no path entry is decryptable from
    ///   this leaf
    /// - [`TreeError::Crypto`] on decapsulation or unsealing failure
    pub fn process_commit(&mut self, commit: &Commit) -> Result<NodeSecret, TreeError> {
        if commit.epoch != self.epoch + 1 {
            return Err(TreeError::StaleCommit { current: self.epoch, received: commit.epoch });
        }

        let mut next = self.clone();
        let root_secret = next.apply_commit(commit)?;
        next.epoch += 1;
        *self = next;
        Ok(root_secret)
    }

    fn apply_commit(&mut self, commit: &Commit) -> Result<NodeSecret, TreeError> {
        let n = self.num_leaves;
        let w = math::node_width(n);
        let committer = commit.committer_leaf_pos as usize;
        if committer >= n {
            return Err(TreeError::LeafOutOfRange { leaf: committer, num_leaves: n });
        }

        // Install the committer's fresh leaf key.
        let leaf_pk = KemPublicKey::from_bytes(&commit.new_leaf_pk)
            .map_err(|_| TreeError::Malformed("committer leaf public key"))?;
        self.nodes[2 * committer].blank();
        self.nodes[2 * committer].public_key = Some(leaf_pk);

        // The entries must be the committer's direct path, leaf to root.
        let expected_path = math::direct_path(committer, n);
        if commit.path.len() != expected_path.len() {
            return Err(TreeError::Malformed("commit path length"));
        }

        // Resolution of each copath subtree must be computed against the
        // pre-commit tree, so find our entry point before installing the
        // rotated public keys.
        let my_leaf_node = 2 * self.my_leaf;
        let mut entry = None;
        for (i, (&x, node)) in expected_path.iter().zip(&commit.path).enumerate() {
            if node.node_index as usize != x || node.node_index as usize >= w {
                return Err(TreeError::Malformed("commit path node index"));
            }
            if entry.is_none() && math::in_subtree(x, my_leaf_node) {
                entry = Some(i);
            }
        }
        let Some(entry_idx) = entry else {
            return Err(TreeError::NoEntryPoint);
        };

        // The child of the entry node on our side of the tree.
        let entry_node = expected_path[entry_idx];
        let our_child = if entry_idx == 0 {
            math::sibling(2 * committer, n)
        } else {
            math::sibling(expected_path[entry_idx - 1], n)
        };
        debug_assert!(math::in_subtree(our_child, my_leaf_node));

        let holder = self.resolve(our_child).ok_or(TreeError::NoEntryPoint)?;
        let secret_key =
            self.nodes[holder].secret_key.as_ref().ok_or(TreeError::NoEntryPoint)?.clone();

        let entry_frame = &commit.path[entry_idx];
        let (Some(kem_ct), Some(aead_ct)) = (&entry_frame.kem_ct, &entry_frame.aead_ct) else {
            return Err(TreeError::NoEntryPoint);
        };

        let ss = secret_key.decapsulate(kem_ct)?;
        let wrap = derive_key(ss.as_ref(), labels::KEM_WRAP);
        let opened = aead_open(&wrap, aead_ct)?;
        let entry_secret: NodeSecret = Zeroizing::new(
            <[u8; 32]>::try_from(opened.as_slice())
                .map_err(|_| TreeError::Malformed("path secret length"))?,
        );

        // Install rotated public keys; old secrets at those nodes are
        // superseded.
        for (&x, node) in expected_path.iter().zip(&commit.path) {
            let pk = KemPublicKey::from_bytes(&node.new_pk)
                .map_err(|_| TreeError::Malformed("path node public key"))?;
            self.nodes[x].blank();
            self.nodes[x].public_key = Some(pk);
        }

        // Derive and store every secret from the entry point to the root.
        let mut prev = entry_secret;
        self.nodes[entry_node].secret = Some(prev.clone());
        for &x in &expected_path[entry_idx + 1..] {
            prev = derive_key(prev.as_ref(), labels::TREE_NODE);
            self.nodes[x].secret = Some(prev.clone());
        }

        Ok(prev)
    }

    /// Build a targeted welcome for a joiner at `joiner_pos`.
    ///
    /// Snapshots every non-blank public key (with the joiner's announced
    /// key at its leaf) and encapsulates the lowest known secret on the
    /// joiner's direct path to the joiner's key.
    ///
    /// # Errors
    ///
    /// [`TreeError::NoPathSecret`] if no secret on the joiner's path is
    /// known locally — a commit must precede the welcome.
    pub fn generate_welcome(
        &self,
        joiner_pos: usize,
        joiner_pk: &KemPublicKey,
        env: &impl Environment,
    ) -> Result<Welcome, TreeError> {
        let n = self.num_leaves;
        if joiner_pos >= n {
            return Err(TreeError::LeafOutOfRange { leaf: joiner_pos, num_leaves: n });
        }

        let mut tree_public_keys: Vec<Option<Vec<u8>>> = self
            .nodes
            .iter()
            .map(|node| node.public_key.as_ref().map(|pk| pk.as_bytes().to_vec()))
            .collect();
        tree_public_keys[2 * joiner_pos] = Some(joiner_pk.as_bytes().to_vec());

        let entry = math::direct_path(joiner_pos, n)
            .into_iter()
            .find(|&x| self.nodes[x].secret.is_some())
            .ok_or(TreeError::NoPathSecret)?;
        let secret = self.nodes[entry]
            .secret
            .as_ref()
            .unwrap_or_else(|| unreachable!("entry selected for having a secret"));

        let (kem_ct, ss) = encapsulate(joiner_pk)?;
        let wrap = derive_key(ss.as_ref(), labels::KEM_WRAP);
        let aead_ct = aead_seal(&wrap, env.random_array(), secret.as_ref());

        Ok(Welcome {
            tree_public_keys,
            num_leaves: n as u32,
            my_leaf_pos: joiner_pos as u32,
            path_secrets: vec![WelcomePathSecret { node_index: entry as u32, kem_ct, aead_ct }],
            epoch: self.epoch,
        })
    }

    /// Reconstruct a joiner's tree view from a welcome.
    ///
    /// # Errors
    ///
    /// - [`TreeError::Malformed`] on a structurally invalid welcome
    /// - [`TreeError::Crypto`] on decapsulation or unsealing failure
    pub fn from_welcome(welcome: &Welcome, kem: &KemKeyPair) -> Result<Self, TreeError> {
        let n = welcome.num_leaves as usize;
        if n < 1 || n > MAX_LEAVES {
            return Err(TreeError::Malformed("welcome leaf count"));
        }
        let w = math::node_width(n);
        if welcome.tree_public_keys.len() != w {
            return Err(TreeError::Malformed("welcome tree width"));
        }
        let my_leaf = welcome.my_leaf_pos as usize;
        if my_leaf >= n {
            return Err(TreeError::Malformed("welcome leaf position"));
        }

        let mut nodes = Vec::with_capacity(w);
        for bytes in &welcome.tree_public_keys {
            let public_key = match bytes {
                Some(bytes) => Some(
                    KemPublicKey::from_bytes(bytes)
                        .map_err(|_| TreeError::Malformed("welcome public key"))?,
                ),
                None => None,
            };
            nodes.push(Node { public_key, secret_key: None, secret: None });
        }

        let mut tree =
            Self { nodes, num_leaves: n, my_leaf, epoch: welcome.epoch };
        tree.nodes[2 * my_leaf].public_key = Some(kem.public.clone());
        tree.nodes[2 * my_leaf].secret_key = Some(kem.secret.clone());

        let entry = welcome.path_secrets.first().ok_or(TreeError::Malformed("empty welcome"))?;
        let entry_node = entry.node_index as usize;
        let path = math::direct_path(my_leaf, n);
        let Some(entry_idx) = path.iter().position(|&x| x == entry_node) else {
            return Err(TreeError::Malformed("welcome entry off path"));
        };

        let ss = kem.secret.decapsulate(&entry.kem_ct)?;
        let wrap = derive_key(ss.as_ref(), labels::KEM_WRAP);
        let opened = aead_open(&wrap, &entry.aead_ct)?;
        let mut prev: NodeSecret = Zeroizing::new(
            <[u8; 32]>::try_from(opened.as_slice())
                .map_err(|_| TreeError::Malformed("path secret length"))?,
        );

        tree.nodes[entry_node].secret = Some(prev.clone());
        for &x in &path[entry_idx + 1..] {
            prev = derive_key(prev.as_ref(), labels::TREE_NODE);
            tree.nodes[x].secret = Some(prev.clone());
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::sim::SimEnvironment;

    fn creator(env: &SimEnvironment) -> (TreeKem, KemKeyPair) {
        let kem = KemKeyPair::generate();
        (TreeKem::create_for_creator(env, &kem), kem)
    }

    #[test]
    fn creator_tree_has_root_secret() {
        let env = SimEnvironment::from_seed(1);
        let (tree, _) = creator(&env);
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.epoch(), 0);
        assert!(tree.root_secret().is_ok());
    }

    #[test]
    fn add_leaf_blanks_new_path() {
        let env = SimEnvironment::from_seed(2);
        let (mut tree, _) = creator(&env);
        let joiner = KemKeyPair::generate();

        let pos = tree.add_leaf(joiner.public.clone()).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(tree.num_leaves(), 2);
        // The old root secret no longer covers the group.
        assert!(tree.root_secret().is_err());
    }

    #[test]
    fn seventeenth_leaf_is_rejected() {
        let env = SimEnvironment::from_seed(3);
        let (mut tree, _) = creator(&env);
        for _ in 0..15 {
            tree.add_leaf(KemKeyPair::generate().public).unwrap();
        }
        assert_eq!(
            tree.add_leaf(KemKeyPair::generate().public),
            Err(TreeError::TreeFull { max: MAX_LEAVES })
        );
    }

    #[test]
    fn commit_and_welcome_agree_for_two_members() {
        let env = SimEnvironment::from_seed(4);
        let (mut alice, _) = creator(&env);
        let bob_kem = KemKeyPair::generate();

        let pos = alice.add_leaf(bob_kem.public.clone()).unwrap();
        let _commit = alice.generate_commit(&env).unwrap();
        let welcome = alice.generate_welcome(pos, &bob_kem.public, &env).unwrap();

        let bob = TreeKem::from_welcome(&welcome, &bob_kem).unwrap();
        assert_eq!(bob.epoch(), alice.epoch());
        assert_eq!(bob.root_secret().unwrap(), alice.root_secret().unwrap());
    }

    #[test]
    fn commit_is_processed_by_existing_members() {
        let env = SimEnvironment::from_seed(5);
        let (mut alice, _) = creator(&env);

        // Bob joins via welcome.
        let bob_kem = KemKeyPair::generate();
        let bob_pos = alice.add_leaf(bob_kem.public.clone()).unwrap();
        alice.generate_commit(&env).unwrap();
        let welcome = alice.generate_welcome(bob_pos, &bob_kem.public, &env).unwrap();
        let mut bob = TreeKem::from_welcome(&welcome, &bob_kem).unwrap();

        // Charlie joins; Bob processes the broadcast commit.
        let charlie_kem = KemKeyPair::generate();
        let charlie_pos = alice.add_leaf(charlie_kem.public.clone()).unwrap();
        bob.add_leaf(charlie_kem.public.clone()).unwrap();

        let commit = alice.generate_commit(&env).unwrap();
        let bob_root = bob.process_commit(&commit).unwrap();
        assert_eq!(&*bob_root, alice.root_secret().unwrap());

        let welcome = alice.generate_welcome(charlie_pos, &charlie_kem.public, &env).unwrap();
        let charlie = TreeKem::from_welcome(&welcome, &charlie_kem).unwrap();
        assert_eq!(charlie.root_secret().unwrap(), alice.root_secret().unwrap());
    }

    #[test]
    fn stale_commit_is_rejected_without_mutation() {
        let env = SimEnvironment::from_seed(6);
        let (mut alice, _) = creator(&env);
        let bob_kem = KemKeyPair::generate();
        let bob_pos = alice.add_leaf(bob_kem.public.clone()).unwrap();
        let commit = alice.generate_commit(&env).unwrap();
        let welcome = alice.generate_welcome(bob_pos, &bob_kem.public, &env).unwrap();
        let mut bob = TreeKem::from_welcome(&welcome, &bob_kem).unwrap();

        // Bob is already at the commit's epoch; replaying it is stale.
        let before = bob.epoch();
        assert_eq!(
            bob.process_commit(&commit),
            Err(TreeError::StaleCommit { current: before, received: commit.epoch })
        );
        assert_eq!(bob.epoch(), before);
    }

    #[test]
    fn removed_member_cannot_follow_the_next_commit() {
        let env = SimEnvironment::from_seed(7);
        let (mut alice, _) = creator(&env);

        let bob_kem = KemKeyPair::generate();
        let bob_pos = alice.add_leaf(bob_kem.public.clone()).unwrap();
        alice.generate_commit(&env).unwrap();
        let welcome = alice.generate_welcome(bob_pos, &bob_kem.public, &env).unwrap();
        let mut bob = TreeKem::from_welcome(&welcome, &bob_kem).unwrap();

        let charlie_kem = KemKeyPair::generate();
        let charlie_pos = alice.add_leaf(charlie_kem.public.clone()).unwrap();
        bob.add_leaf(charlie_kem.public.clone()).unwrap();
        let commit = alice.generate_commit(&env).unwrap();
        bob.process_commit(&commit).unwrap();
        let welcome = alice.generate_welcome(charlie_pos, &charlie_kem.public, &env).unwrap();
        let mut charlie = TreeKem::from_welcome(&welcome, &charlie_kem).unwrap();

        // Bob leaves; Alice and Charlie rotate without him.
        alice.remove_leaf(bob_pos).unwrap();
        charlie.remove_leaf(bob_pos).unwrap();

        let commit = alice.generate_commit(&env).unwrap();
        let charlie_root = charlie.process_commit(&commit).unwrap();
        assert_eq!(&*charlie_root, alice.root_secret().unwrap());

        // Bob's stale tree finds no usable entry point: his subtree was
        // blanked before the commit was generated.
        let result = bob.process_commit(&commit);
        assert!(matches!(result, Err(TreeError::NoEntryPoint) | Err(TreeError::Crypto(_))));
    }

    #[test]
    fn group_key_changes_on_every_commit() {
        let env = SimEnvironment::from_seed(8);
        let (mut alice, _) = creator(&env);
        let bob_kem = KemKeyPair::generate();
        let bob_pos = alice.add_leaf(bob_kem.public.clone()).unwrap();
        alice.generate_commit(&env).unwrap();
        let welcome = alice.generate_welcome(bob_pos, &bob_kem.public, &env).unwrap();
        let mut bob = TreeKem::from_welcome(&welcome, &bob_kem).unwrap();

        let root_before = alice.root_secret().unwrap().to_owned();
        let commit = alice.generate_commit(&env).unwrap();
        bob.process_commit(&commit).unwrap();

        assert_ne!(alice.root_secret().unwrap(), &root_before);
        assert_eq!(bob.root_secret().unwrap(), alice.root_secret().unwrap());
    }

    #[test]
    fn remove_leaf_out_of_range_is_rejected() {
        let env = SimEnvironment::from_seed(9);
        let (mut tree, _) = creator(&env);
        assert_eq!(
            tree.remove_leaf(3),
            Err(TreeError::LeafOutOfRange { leaf: 3, num_leaves: 1 })
        );
    }

    #[test]
    fn welcome_requires_a_known_path_secret() {
        let env = SimEnvironment::from_seed(10);
        let (mut tree, _) = creator(&env);
        let joiner = KemKeyPair::generate();
        let pos = tree.add_leaf(joiner.public.clone()).unwrap();

        // No commit yet: nothing on the joiner's path is known.
        assert_eq!(
            tree.generate_welcome(pos, &joiner.public, &env),
            Err(TreeError::NoPathSecret)
        );
    }
}
