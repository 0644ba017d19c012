//! Group key management.
//!
//! [`GroupKeyManager`] owns the signing identity, the session KEM
//! keypair, the peer registry, the TreeKEM state, and the per-sender
//! chains. It enforces the announcement signature discipline (every KEM
//! key is signed by its owner's identity key and checked against the
//! trust store), elects the rekey initiator deterministically, and turns
//! epoch changes into fresh chain sets.
//!
//! All secret material is zeroized on drop, so dropping the manager is
//! session teardown.

use std::{collections::HashMap, time::Duration};

use parrhesia_crypto::{
    KEM_PUBLIC_KEY_LEN, KemKeyPair, KemPublicKey, SIGNING_PUBLIC_KEY_LEN, SigningKeyPair,
    SigningPublicKey, aead_open, aead_seal, derive_key, labels, sign, verify,
};
use parrhesia_proto::{Commit, Welcome};
use tracing::{debug, warn};

use crate::{
    chain::EpochChains,
    color,
    env::Environment,
    error::GroupError,
    tofu::TofuStore,
    tree::{MAX_LEAVES, TreeKem},
};

/// How long previous-epoch chains survive after a rekey.
pub const GRACE_WINDOW: Duration = Duration::from_secs(30);

/// The context a rekey decision is made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RekeyContext {
    /// A member joined.
    Add,
    /// A member left.
    Remove,
    /// The periodic message-count rekey.
    Interval,
}

/// A signed key announcement, the body of a `key_announce` frame.
#[derive(Debug, Clone)]
pub struct KeyAnnouncement {
    /// ML-DSA-65 signing public key.
    pub public_key: Vec<u8>,
    /// ML-KEM-768 public key.
    pub pq_public_key: Vec<u8>,
    /// Signature over `pq_public_key` under `public_key`.
    pub sig: Vec<u8>,
}

/// An encrypted outbound message.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Sealed payload: `iv ∥ ct ∥ tag`.
    pub payload: Vec<u8>,
    /// Epoch the message was encrypted under.
    pub epoch: u64,
    /// The send chain counter used.
    pub counter: u64,
}

/// Everything known about one remote participant.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    /// Server-assigned identifier.
    pub peer_id: String,
    /// Announced signing key.
    pub signing_key: SigningPublicKey,
    /// Announced KEM key (the key the peer joined with).
    pub kem_key: KemPublicKey,
    /// Identity fingerprint: base64 of the signing key.
    pub fingerprint: String,
    /// Leaf position in the tree.
    pub leaf_pos: usize,
    /// Deterministic display color.
    pub color: &'static str,
    /// Announcement arrival index, used to reconcile leaf positions
    /// against a welcome snapshot.
    arrival: usize,
}

/// Client-side group key state for one room membership.
pub struct GroupKeyManager<E: Environment> {
    env: E,
    room_id: String,
    identity: SigningKeyPair,
    kem: KemKeyPair,
    self_fingerprint: String,
    self_color: &'static str,
    self_id: Option<String>,
    peers: HashMap<String, PeerRecord>,
    next_arrival: usize,
    /// Leaf allocation cursor used before any tree state exists.
    next_leaf: usize,
    tree: Option<TreeKem>,
    chains: Option<EpochChains>,
    previous_chains: Option<(EpochChains, E::Instant)>,
    tofu: Box<dyn TofuStore>,
}

impl<E: Environment> GroupKeyManager<E> {
    /// Create a manager for one room membership.
    ///
    /// Generates the session KEM keypair; the signing identity is the
    /// caller's long-lived keypair.
    pub fn new(env: E, room_id: String, identity: SigningKeyPair, tofu: Box<dyn TofuStore>) -> Self {
        let self_fingerprint = identity.fingerprint();
        let self_color = color::PALETTE[color::preferred_slot(identity.public.as_bytes())];

        Self {
            env,
            room_id,
            identity,
            kem: KemKeyPair::generate(),
            self_fingerprint,
            self_color,
            self_id: None,
            peers: HashMap::new(),
            next_arrival: 0,
            next_leaf: 0,
            tree: None,
            chains: None,
            previous_chains: None,
            tofu,
        }
    }

    /// Room this manager belongs to.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// This client's identity fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.self_fingerprint
    }

    /// This client's display color.
    pub fn self_color(&self) -> &'static str {
        self.self_color
    }

    /// Server-assigned identifier, once the welcome arrived.
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Record the server-assigned identifier.
    pub fn set_self_id(&mut self, peer_id: String) {
        self.self_id = Some(peer_id);
    }

    /// True once tree state exists (created or welcomed).
    pub fn has_group(&self) -> bool {
        self.tree.is_some()
    }

    /// Current epoch, once a group key is established.
    pub fn epoch(&self) -> Option<u64> {
        self.chains.as_ref().map(EpochChains::epoch)
    }

    /// Look up a peer.
    pub fn peer(&self, peer_id: &str) -> Option<&PeerRecord> {
        self.peers.get(peer_id)
    }

    /// Number of connected remote peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// The signed announcement for the `key_announce` frame.
    pub fn announce(&self) -> KeyAnnouncement {
        let pq_public_key = self.kem.public.as_bytes().to_vec();
        let sig = sign(&self.identity.secret, &pq_public_key);
        KeyAnnouncement {
            public_key: self.identity.public.as_bytes().to_vec(),
            pq_public_key,
            sig,
        }
    }

    /// Create the single-leaf tree for a room creator and derive the
    /// first group key.
    ///
    /// # Errors
    ///
    /// [`GroupError::RekeyFailed`] if no peer id has been assigned yet.
    pub fn create_group(&mut self) -> Result<(), GroupError> {
        let tree = TreeKem::create_for_creator(&self.env, &self.kem);
        self.next_leaf = tree.num_leaves();
        self.tree = Some(tree);
        self.rotate_chains()
    }

    /// Admit an announced peer.
    ///
    /// Checks, in order: signing key length, KEM key length, signature
    /// over the KEM key, trust store. On any failure nothing is mutated.
    /// On success the peer enters the registry and (when tree state
    /// exists) the tree.
    ///
    /// # Errors
    ///
    /// - [`GroupError::InvalidKey`] on a bad key length
    /// - [`GroupError::InvalidSignature`] if the announcement signature
    ///   does not cover the KEM key
    /// - [`GroupError::RoomFull`] past 16 members
    /// - [`GroupError::TofuConflict`] if the fingerprint is bound to a
    ///   different identity
    pub fn add_peer(
        &mut self,
        peer_id: &str,
        public_key: &[u8],
        pq_public_key: &[u8],
        sig: &[u8],
    ) -> Result<(), GroupError> {
        if public_key.len() != SIGNING_PUBLIC_KEY_LEN {
            return Err(GroupError::InvalidKey {
                what: "signing public key",
                expected: SIGNING_PUBLIC_KEY_LEN,
                actual: public_key.len(),
            });
        }
        if pq_public_key.len() != KEM_PUBLIC_KEY_LEN {
            return Err(GroupError::InvalidKey {
                what: "KEM public key",
                expected: KEM_PUBLIC_KEY_LEN,
                actual: pq_public_key.len(),
            });
        }

        let Ok(signing_key) = SigningPublicKey::from_bytes(public_key) else {
            unreachable!("length checked above");
        };
        if !verify(&signing_key, pq_public_key, sig) {
            return Err(GroupError::InvalidSignature);
        }

        if self.peers.contains_key(peer_id) {
            warn!(peer_id, "duplicate announcement ignored");
            return Ok(());
        }

        let occupied = match &self.tree {
            Some(tree) => tree.num_leaves(),
            None => self.next_leaf + 1, // reserve our own future leaf
        };
        if occupied >= MAX_LEAVES {
            return Err(GroupError::RoomFull { max: MAX_LEAVES });
        }

        let fingerprint = signing_key.fingerprint();
        self.tofu
            .evaluate(&self.room_id, &fingerprint, peer_id, self.env.wall_clock_secs())
            .map_err(|conflict| GroupError::TofuConflict {
                fingerprint: conflict.fingerprint,
                bound_peer_id: conflict.bound_peer_id,
            })?;

        let Ok(kem_key) = KemPublicKey::from_bytes(pq_public_key) else {
            unreachable!("length checked above");
        };

        let leaf_pos = match &mut self.tree {
            Some(tree) => tree.add_leaf(kem_key.clone())?,
            None => {
                let pos = self.next_leaf;
                self.next_leaf += 1;
                pos
            },
        };

        debug!(peer_id, leaf_pos, "peer admitted");
        self.peers.insert(peer_id.to_owned(), PeerRecord {
            peer_id: peer_id.to_owned(),
            signing_key,
            kem_key,
            fingerprint,
            leaf_pos,
            color: "",
            arrival: self.next_arrival,
        });
        self.next_arrival += 1;
        self.recompute_colors();
        Ok(())
    }

    /// Remove a departed peer: registry entry, chains, and tree leaf.
    ///
    /// # Errors
    ///
    /// [`GroupError::UnknownPeer`] if no such peer is registered.
    pub fn remove_peer(&mut self, peer_id: &str) -> Result<(), GroupError> {
        let record = self
            .peers
            .remove(peer_id)
            .ok_or_else(|| GroupError::UnknownPeer { peer_id: peer_id.to_owned() })?;

        if let Some(tree) = &mut self.tree {
            tree.remove_leaf(record.leaf_pos)?;
        }
        if let Some(chains) = &mut self.chains {
            chains.drop_recv(peer_id);
        }

        debug!(peer_id, leaf_pos = record.leaf_pos, "peer removed");
        self.recompute_colors();
        Ok(())
    }

    /// Decide whether this client is the rekey initiator.
    ///
    /// The initiator is the lexicographically smallest fingerprint among
    /// connected participants (self included). For an add, the new
    /// arrival is not yet eligible. Deterministic, so every honest
    /// member elects the same initiator.
    pub fn should_initiate_rekey(
        &self,
        context: RekeyContext,
        new_peer_id: Option<&str>,
    ) -> bool {
        let mut smallest = self.self_fingerprint.as_str();
        for record in self.peers.values() {
            if context == RekeyContext::Add && Some(record.peer_id.as_str()) == new_peer_id {
                continue;
            }
            if record.fingerprint.as_str() < smallest {
                smallest = &record.fingerprint;
            }
        }
        smallest == self.self_fingerprint
    }

    /// Rotate this member's path and derive the next epoch's keys.
    ///
    /// Returns the commit to broadcast. The local epoch advances
    /// immediately, so subsequent ciphertexts carry the new epoch while
    /// peers keep the grace window open for in-flight frames.
    ///
    /// # Errors
    ///
    /// [`GroupError::RekeyFailed`] without tree state or on a local
    /// inconsistency.
    pub fn initiate_rekey(&mut self) -> Result<Commit, GroupError> {
        let Some(tree) = &mut self.tree else {
            return Err(GroupError::RekeyFailed { reason: "no tree state".into() });
        };
        let commit = tree
            .generate_commit(&self.env)
            .map_err(|e| GroupError::RekeyFailed { reason: e.to_string() })?;

        self.rotate_chains()?;
        debug!(epoch = commit.epoch, "rekey initiated");
        Ok(commit)
    }

    /// Build the targeted welcome for a freshly admitted peer. Called by
    /// the committer directly after [`Self::initiate_rekey`].
    ///
    /// # Errors
    ///
    /// [`GroupError::UnknownPeer`] for an unregistered peer;
    /// [`GroupError::RekeyFailed`] without tree state.
    pub fn generate_welcome_for(&self, peer_id: &str) -> Result<Welcome, GroupError> {
        let Some(tree) = &self.tree else {
            return Err(GroupError::RekeyFailed { reason: "no tree state".into() });
        };
        let record = self
            .peers
            .get(peer_id)
            .ok_or_else(|| GroupError::UnknownPeer { peer_id: peer_id.to_owned() })?;

        tree.generate_welcome(record.leaf_pos, &record.kem_key, &self.env)
            .map_err(|e| GroupError::RekeyFailed { reason: e.to_string() })
    }

    /// Apply a peer's commit and roll the chains forward.
    ///
    /// # Errors
    ///
    /// - [`GroupError::NotEstablished`] before any tree state exists
    /// - [`GroupError::StaleCommit`] on an epoch mismatch (dropped)
    /// - [`GroupError::KemDecapFailure`] if the entry point cannot be
    ///   opened (dropped, state unchanged)
    pub fn receive_commit(&mut self, commit: &Commit) -> Result<(), GroupError> {
        let Some(tree) = &mut self.tree else {
            return Err(GroupError::NotEstablished);
        };
        tree.process_commit(commit)?;
        debug!(epoch = commit.epoch, "commit applied");
        self.rotate_chains()
    }

    /// Adopt the tree from a targeted welcome and derive the group key.
    ///
    /// Reconciles registered peers' leaf positions against the welcome's
    /// snapshot: announcements arrived in join order, and join order maps
    /// onto the occupied leaves left to right.
    ///
    /// # Errors
    ///
    /// [`GroupError::RekeyFailed`] on a malformed or inconsistent
    /// welcome; [`GroupError::KemDecapFailure`] if the path secret cannot
    /// be opened.
    pub fn receive_welcome(&mut self, welcome: &Welcome) -> Result<(), GroupError> {
        let tree = TreeKem::from_welcome(welcome, &self.kem)?;

        let occupied: Vec<usize> = (0..tree.num_leaves())
            .filter(|&p| {
                p != tree.my_leaf()
                    && welcome.tree_public_keys.get(2 * p).is_some_and(Option::is_some)
            })
            .collect();
        if occupied.len() != self.peers.len() {
            return Err(GroupError::RekeyFailed {
                reason: format!(
                    "welcome names {} occupied leaves, registry has {} peers",
                    occupied.len(),
                    self.peers.len()
                ),
            });
        }

        let mut by_arrival: Vec<&mut PeerRecord> = self.peers.values_mut().collect();
        by_arrival.sort_by_key(|record| record.arrival);
        for (record, &leaf_pos) in by_arrival.into_iter().zip(&occupied) {
            record.leaf_pos = leaf_pos;
        }

        self.next_leaf = tree.num_leaves();
        debug!(epoch = welcome.epoch, leaf = tree.my_leaf(), "welcome applied");
        self.tree = Some(tree);
        self.rotate_chains()
    }

    /// Encrypt a message on the send chain.
    ///
    /// # Errors
    ///
    /// [`GroupError::NotEstablished`] before the first group key.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<OutboundMessage, GroupError> {
        let Some(chains) = &mut self.chains else {
            return Err(GroupError::NotEstablished);
        };
        let epoch = chains.epoch();
        let (counter, key) = chains.send().next_message_key();
        let payload = aead_seal(&key, self.env.random_array(), plaintext);
        Ok(OutboundMessage { payload, epoch, counter })
    }

    /// Decrypt a received message.
    ///
    /// Messages from the current epoch use the live chains; messages from
    /// the immediately previous epoch use the retained chains while the
    /// grace window is open. Chain state only advances when the payload
    /// authenticates.
    ///
    /// # Errors
    ///
    /// - [`GroupError::EpochOutOfWindow`] outside current and grace epochs
    /// - [`GroupError::UnknownPeer`] for a sender without a chain
    /// - [`GroupError::OutOfOrder`] for an unrecoverable counter
    /// - [`GroupError::AeadAuthFailure`] on authentication failure
    pub fn decrypt(
        &mut self,
        peer_id: &str,
        payload: &[u8],
        epoch: u64,
        counter: u64,
    ) -> Result<Vec<u8>, GroupError> {
        self.expire_previous();

        let current = self.chains.as_ref().ok_or(GroupError::NotEstablished)?.epoch();
        let chains = if epoch == current {
            match &mut self.chains {
                Some(chains) => chains,
                // INVARIANT: checked non-None two lines up.
                None => unreachable!("current chains checked above"),
            }
        } else if current > 0 && epoch == current - 1 {
            match &mut self.previous_chains {
                Some((chains, _)) => chains,
                None => {
                    return Err(GroupError::EpochOutOfWindow { current, received: epoch });
                },
            }
        } else {
            return Err(GroupError::EpochOutOfWindow { current, received: epoch });
        };

        let mut chain = chains
            .recv(peer_id)
            .cloned()
            .ok_or_else(|| GroupError::UnknownPeer { peer_id: peer_id.to_owned() })?;
        let key = chain.message_key(counter)?;
        let plaintext = aead_open(&key, payload).map_err(|_| GroupError::AeadAuthFailure)?;

        // Authenticated: commit the advanced chain state.
        chains.put_recv(peer_id, chain);
        Ok(plaintext)
    }

    /// Housekeeping: drop previous-epoch chains once the grace window
    /// closes. Idempotent and cheap; call on every timer tick.
    pub fn tick(&mut self) {
        self.expire_previous();
    }

    fn expire_previous(&mut self) {
        if let Some((_, deadline)) = &self.previous_chains {
            if self.env.now() >= *deadline {
                debug!("previous-epoch chains dropped");
                self.previous_chains = None;
            }
        }
    }

    fn rotate_chains(&mut self) -> Result<(), GroupError> {
        let Some(tree) = &self.tree else {
            return Err(GroupError::NotEstablished);
        };
        let Some(self_id) = self.self_id.as_deref() else {
            return Err(GroupError::RekeyFailed { reason: "no assigned peer id".into() });
        };
        let root = tree
            .root_secret()
            .map_err(|e| GroupError::RekeyFailed { reason: e.to_string() })?;
        let group_key = derive_key(root, labels::TREE_ROOT);

        let chains = EpochChains::seed(
            &group_key,
            tree.epoch(),
            self_id,
            self.peers.keys().map(String::as_str),
        );
        if let Some(old) = self.chains.take() {
            self.previous_chains = Some((old, self.env.now() + GRACE_WINDOW));
        }
        self.chains = Some(chains);
        Ok(())
    }

    fn recompute_colors(&mut self) {
        let mut members: Vec<(String, Vec<u8>)> = Vec::with_capacity(self.peers.len() + 1);
        members.push((
            self.self_fingerprint.clone(),
            self.identity.public.as_bytes().to_vec(),
        ));
        for record in self.peers.values() {
            members.push((record.fingerprint.clone(), record.signing_key.as_bytes().to_vec()));
        }

        let assigned =
            color::assign_colors(members.iter().map(|(fp, pk)| (fp.as_str(), pk.as_slice())));
        if let Some(own) = assigned.get(&self.self_fingerprint) {
            self.self_color = own;
        }
        for record in self.peers.values_mut() {
            if let Some(color) = assigned.get(&record.fingerprint) {
                record.color = color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{env::sim::SimEnvironment, tofu::MemoryTofuStore};

    fn manager(env: &SimEnvironment) -> (GroupKeyManager<SimEnvironment>, SigningKeyPair) {
        let identity = SigningKeyPair::generate();
        let manager = GroupKeyManager::new(
            env.clone(),
            "room".into(),
            identity.clone(),
            Box::new(MemoryTofuStore::new()),
        );
        (manager, identity)
    }

    #[test]
    fn announcement_verifies_under_its_own_key() {
        let env = SimEnvironment::from_seed(1);
        let (alice, _) = manager(&env);

        let ann = alice.announce();
        let pk = SigningPublicKey::from_bytes(&ann.public_key).unwrap();
        assert!(verify(&pk, &ann.pq_public_key, &ann.sig));
    }

    #[test]
    fn creator_can_encrypt_to_itself() {
        let env = SimEnvironment::from_seed(2);
        let (mut alice, _) = manager(&env);
        alice.set_self_id("a".into());
        alice.create_group().unwrap();

        let out = alice.encrypt(b"hello").unwrap();
        assert_eq!(out.epoch, 0);
        assert_eq!(out.counter, 0);

        let plain = alice.decrypt("a", &out.payload, out.epoch, out.counter).unwrap();
        assert_eq!(plain, b"hello");

        // Counter advanced.
        assert_eq!(alice.encrypt(b"again").unwrap().counter, 1);
    }

    #[test]
    fn add_peer_enforces_key_lengths() {
        let env = SimEnvironment::from_seed(3);
        let (mut alice, _) = manager(&env);

        let err = alice.add_peer("b", &[0u8; 10], &[0u8; KEM_PUBLIC_KEY_LEN], &[]).unwrap_err();
        assert!(matches!(err, GroupError::InvalidKey { what: "signing public key", .. }));

        let bob_identity = SigningKeyPair::generate();
        let err = alice
            .add_peer("b", bob_identity.public.as_bytes(), &[0u8; 10], &[])
            .unwrap_err();
        assert!(matches!(err, GroupError::InvalidKey { what: "KEM public key", .. }));

        assert_eq!(alice.peer_count(), 0);
    }

    #[test]
    fn add_peer_rejects_signature_over_wrong_payload() {
        let env = SimEnvironment::from_seed(4);
        let (mut alice, _) = manager(&env);

        let bob_identity = SigningKeyPair::generate();
        let bob_kem = KemKeyPair::generate();
        // Signature over the signing key instead of the KEM key.
        let bad_sig = sign(&bob_identity.secret, bob_identity.public.as_bytes());

        let err = alice
            .add_peer(
                "b",
                bob_identity.public.as_bytes(),
                bob_kem.public.as_bytes(),
                &bad_sig,
            )
            .unwrap_err();
        assert_eq!(err, GroupError::InvalidSignature);
        assert_eq!(alice.peer_count(), 0);
    }

    #[test]
    fn add_peer_rejects_forged_announcements() {
        let env = SimEnvironment::from_seed(5);
        let (mut alice, _) = manager(&env);

        // Mallory signs Alice's KEM key with her own identity, but the
        // frame claims Bob's public key.
        let bob_identity = SigningKeyPair::generate();
        let mallory_identity = SigningKeyPair::generate();
        let kem = KemKeyPair::generate();
        let sig = sign(&mallory_identity.secret, kem.public.as_bytes());

        let err = alice
            .add_peer("b", bob_identity.public.as_bytes(), kem.public.as_bytes(), &sig)
            .unwrap_err();
        assert_eq!(err, GroupError::InvalidSignature);
    }

    #[test]
    fn tofu_conflict_rejects_peer() {
        let env = SimEnvironment::from_seed(6);
        let (mut alice, _) = manager(&env);

        let identity = SigningKeyPair::generate();
        let kem = KemKeyPair::generate();
        let sig = sign(&identity.secret, kem.public.as_bytes());

        alice.add_peer("b", identity.public.as_bytes(), kem.public.as_bytes(), &sig).unwrap();

        // Same fingerprint reappears under a different peer identity.
        let err = alice
            .add_peer("c", identity.public.as_bytes(), kem.public.as_bytes(), &sig)
            .unwrap_err();
        assert!(matches!(err, GroupError::TofuConflict { .. }));
        assert_eq!(alice.peer_count(), 1);
    }

    #[test]
    fn election_picks_smallest_fingerprint() {
        let env = SimEnvironment::from_seed(7);
        let (mut alice, alice_identity) = manager(&env);

        let bob_identity = SigningKeyPair::generate();
        let bob_kem = KemKeyPair::generate();
        let sig = sign(&bob_identity.secret, bob_kem.public.as_bytes());
        alice
            .add_peer("b", bob_identity.public.as_bytes(), bob_kem.public.as_bytes(), &sig)
            .unwrap();

        let alice_wins = alice_identity.fingerprint() < bob_identity.fingerprint();
        assert_eq!(alice.should_initiate_rekey(RekeyContext::Interval, None), alice_wins);
        // For the add, only pre-join members are eligible: Alice is alone.
        assert!(alice.should_initiate_rekey(RekeyContext::Add, Some("b")));
    }

    #[test]
    fn seventeenth_member_is_rejected() {
        let env = SimEnvironment::from_seed(8);
        let (mut alice, _) = manager(&env);
        alice.set_self_id("a".into());
        alice.create_group().unwrap();

        for i in 0..15 {
            let identity = SigningKeyPair::generate();
            let kem = KemKeyPair::generate();
            let sig = sign(&identity.secret, kem.public.as_bytes());
            alice
                .add_peer(
                    &format!("p{i}"),
                    identity.public.as_bytes(),
                    kem.public.as_bytes(),
                    &sig,
                )
                .unwrap();
        }

        let identity = SigningKeyPair::generate();
        let kem = KemKeyPair::generate();
        let sig = sign(&identity.secret, kem.public.as_bytes());
        let err = alice
            .add_peer("p15", identity.public.as_bytes(), kem.public.as_bytes(), &sig)
            .unwrap_err();
        assert_eq!(err, GroupError::RoomFull { max: MAX_LEAVES });
    }

    #[test]
    fn colors_are_assigned_and_distinct() {
        let env = SimEnvironment::from_seed(9);
        let (mut alice, _) = manager(&env);

        let identity = SigningKeyPair::generate();
        let kem = KemKeyPair::generate();
        let sig = sign(&identity.secret, kem.public.as_bytes());
        alice.add_peer("b", identity.public.as_bytes(), kem.public.as_bytes(), &sig).unwrap();

        let peer_color = alice.peer("b").unwrap().color;
        assert!(!peer_color.is_empty());
        assert_ne!(peer_color, alice.self_color());
    }
}
