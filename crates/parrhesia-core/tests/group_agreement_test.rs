//! Multi-party group key agreement tests.
//!
//! Drives several `GroupKeyManager`s through the announce → admit →
//! commit/welcome flow directly, without the session layer, and checks
//! that every party converges on the same keys.

use std::time::Duration;

use parrhesia_core::{
    GRACE_WINDOW, GroupError, GroupKeyManager, KeyAnnouncement, MemoryTofuStore, RekeyContext,
    env::sim::SimEnvironment,
};
use parrhesia_crypto::SigningKeyPair;

type Manager = GroupKeyManager<SimEnvironment>;

fn manager(env: &SimEnvironment, peer_id: &str) -> Manager {
    let mut m = GroupKeyManager::new(
        env.clone(),
        "room".into(),
        SigningKeyPair::generate(),
        Box::new(MemoryTofuStore::new()),
    );
    m.set_self_id(peer_id.into());
    m
}

fn admit(target: &mut Manager, peer_id: &str, ann: &KeyAnnouncement) {
    target.add_peer(peer_id, &ann.public_key, &ann.pq_public_key, &ann.sig).unwrap();
}

/// Creator + one joiner, keys agreed via commit + welcome.
fn two_party(env: &SimEnvironment) -> (Manager, Manager) {
    let mut alice = manager(env, "a");
    let mut bob = manager(env, "b");
    alice.create_group().unwrap();

    admit(&mut alice, "b", &bob.announce());
    admit(&mut bob, "a", &alice.announce());

    alice.initiate_rekey().unwrap();
    let welcome = alice.generate_welcome_for("b").unwrap();
    bob.receive_welcome(&welcome).unwrap();

    (alice, bob)
}

#[test]
fn two_parties_exchange_messages_both_ways() {
    let env = SimEnvironment::from_seed(11);
    let (mut alice, mut bob) = two_party(&env);
    assert_eq!(alice.epoch(), Some(1));
    assert_eq!(bob.epoch(), Some(1));

    let out = alice.encrypt(b"hi B").unwrap();
    assert_eq!((out.epoch, out.counter), (1, 0));
    assert_eq!(bob.decrypt("a", &out.payload, out.epoch, out.counter).unwrap(), b"hi B");

    let back = bob.encrypt(b"hi A").unwrap();
    assert_eq!(alice.decrypt("b", &back.payload, back.epoch, back.counter).unwrap(), b"hi A");
}

#[test]
fn third_member_joins_through_broadcast_commit() {
    let env = SimEnvironment::from_seed(12);
    let (mut alice, mut bob) = two_party(&env);
    let mut charlie = manager(&env, "c");

    // Charlie announces; both members admit; Alice (the initiator)
    // commits and welcomes.
    let ann = charlie.announce();
    admit(&mut alice, "c", &ann);
    admit(&mut bob, "c", &ann);
    admit(&mut charlie, "a", &alice.announce());
    admit(&mut charlie, "b", &bob.announce());

    let commit = alice.initiate_rekey().unwrap();
    bob.receive_commit(&commit).unwrap();
    let welcome = alice.generate_welcome_for("c").unwrap();
    charlie.receive_welcome(&welcome).unwrap();

    assert_eq!(alice.epoch(), Some(2));
    assert_eq!(bob.epoch(), Some(2));
    assert_eq!(charlie.epoch(), Some(2));

    // Every pair can talk.
    let from_a = alice.encrypt(b"from A").unwrap();
    assert_eq!(bob.decrypt("a", &from_a.payload, from_a.epoch, from_a.counter).unwrap(), b"from A");
    assert_eq!(
        charlie.decrypt("a", &from_a.payload, from_a.epoch, from_a.counter).unwrap(),
        b"from A"
    );

    let from_c = charlie.encrypt(b"from C").unwrap();
    assert_eq!(
        alice.decrypt("c", &from_c.payload, from_c.epoch, from_c.counter).unwrap(),
        b"from C"
    );
    assert_eq!(bob.decrypt("c", &from_c.payload, from_c.epoch, from_c.counter).unwrap(), b"from C");
}

#[test]
fn removal_rotates_keys_away_from_the_departed() {
    let env = SimEnvironment::from_seed(13);
    let (mut alice, mut bob) = two_party(&env);
    let mut charlie = manager(&env, "c");

    let ann = charlie.announce();
    admit(&mut alice, "c", &ann);
    admit(&mut bob, "c", &ann);
    admit(&mut charlie, "a", &alice.announce());
    admit(&mut charlie, "b", &bob.announce());

    let commit = alice.initiate_rekey().unwrap();
    bob.receive_commit(&commit).unwrap();
    let welcome = alice.generate_welcome_for("c").unwrap();
    charlie.receive_welcome(&welcome).unwrap();

    // Capture a ciphertext from Bob at epoch 2, then drop Bob.
    let captured = bob.encrypt(b"old secret").unwrap();
    assert_eq!(captured.epoch, 2);

    alice.remove_peer("b").unwrap();
    charlie.remove_peer("b").unwrap();
    let commit = alice.initiate_rekey().unwrap();
    charlie.receive_commit(&commit).unwrap();
    assert_eq!(alice.epoch(), Some(3));
    assert_eq!(charlie.epoch(), Some(3));

    // The new epoch still works without Bob.
    let fresh = alice.encrypt(b"post-removal").unwrap();
    assert_eq!(
        charlie.decrypt("a", &fresh.payload, fresh.epoch, fresh.counter).unwrap(),
        b"post-removal"
    );

    // Replaying Bob's old ciphertext relabeled for the new epoch hits
    // the wrong key.
    let err = charlie.decrypt("c", &captured.payload, 3, 0).unwrap_err();
    assert_eq!(err, GroupError::AeadAuthFailure);

    // Bob, removed before the commit, cannot follow it at all.
    let err = bob.receive_commit(&commit).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn grace_window_accepts_then_expires_previous_epoch() {
    let env = SimEnvironment::from_seed(14);
    let (mut alice, mut bob) = two_party(&env);

    // Bob sends just before Alice rotates.
    let late = bob.encrypt(b"in flight").unwrap();
    assert_eq!(late.epoch, 1);

    let commit = alice.initiate_rekey().unwrap();
    bob.receive_commit(&commit).unwrap();
    assert_eq!(alice.epoch(), Some(2));

    // Within the grace window the previous-epoch frame still decrypts.
    env.advance(GRACE_WINDOW - Duration::from_secs(1));
    assert_eq!(alice.decrypt("b", &late.payload, late.epoch, late.counter).unwrap(), b"in flight");

    // Past the window the previous epoch is rejected outright.
    env.advance(Duration::from_secs(2));
    let err = alice.decrypt("b", &late.payload, 1, late.counter).unwrap_err();
    assert_eq!(err, GroupError::EpochOutOfWindow { current: 2, received: 1 });
}

#[test]
fn epochs_are_strictly_monotonic() {
    let env = SimEnvironment::from_seed(15);
    let (mut alice, mut bob) = two_party(&env);

    let mut last = bob.epoch().unwrap();
    for _ in 0..4 {
        let commit = alice.initiate_rekey().unwrap();
        bob.receive_commit(&commit).unwrap();
        let epoch = bob.epoch().unwrap();
        assert_eq!(epoch, last + 1);
        last = epoch;
    }
}

#[test]
fn replayed_commit_is_dropped_without_effect() {
    let env = SimEnvironment::from_seed(16);
    let (mut alice, mut bob) = two_party(&env);

    let commit = alice.initiate_rekey().unwrap();
    bob.receive_commit(&commit).unwrap();

    let err = bob.receive_commit(&commit).unwrap_err();
    assert_eq!(err, GroupError::StaleCommit { current: 2, received: 2 });
    assert!(!err.is_fatal());
    assert_eq!(bob.epoch(), Some(2));
}

#[test]
fn election_is_consistent_across_members() {
    let env = SimEnvironment::from_seed(17);
    let (alice, bob) = two_party(&env);

    let alice_initiates = alice.should_initiate_rekey(RekeyContext::Interval, None);
    let bob_initiates = bob.should_initiate_rekey(RekeyContext::Interval, None);
    assert_ne!(alice_initiates, bob_initiates, "exactly one initiator");
}
