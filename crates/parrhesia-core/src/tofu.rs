//! Trust-on-first-use records.
//!
//! The first time a signing-key fingerprint appears in a room it is bound
//! to the announcing peer identity. Later sightings must match that
//! binding; a mismatch (or a record explicitly marked as changed) rejects
//! the peer and leaves the record for a human to resolve. Verification —
//! a user comparing safety numbers out of band — upgrades a record for 30
//! days.
//!
//! Persistence is the shell's concern: the core talks to a small store
//! interface and ships an in-memory implementation.

use std::collections::HashMap;

use thiserror::Error;

/// Seconds before a verified record demotes back to unverified.
pub const VERIFIED_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Trust level of a fingerprint binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustStatus {
    /// Seen and bound, never verified out of band.
    Unverified,
    /// Verified out of band within the last 30 days.
    Verified,
    /// The binding was flagged as changed; the peer is rejected until a
    /// human resolves it.
    KeyChanged,
}

/// One fingerprint binding within a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TofuRecord {
    /// Peer identity the fingerprint was first seen as.
    pub peer_id: String,
    /// Current trust level.
    pub status: TrustStatus,
    /// Unix seconds of the first sighting.
    pub first_seen: u64,
    /// Unix seconds of the latest sighting.
    pub last_seen: u64,
    /// Unix seconds of the latest out-of-band verification.
    pub verified_at: Option<u64>,
}

/// A fingerprint is already bound to a different identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("fingerprint {fingerprint} already bound to {bound_peer_id}")]
pub struct TofuConflict {
    /// The conflicting fingerprint.
    pub fingerprint: String,
    /// The identity it was first bound to.
    pub bound_peer_id: String,
}

/// Store of `(room, fingerprint) → binding` records.
pub trait TofuStore: Send {
    /// Evaluate a sighting of `fingerprint` claiming to be `peer_id`.
    ///
    /// Inserts a fresh `Unverified` binding on first sight; refreshes
    /// `last_seen` on a matching sighting, demoting an expired `Verified`
    /// status.
    ///
    /// # Errors
    ///
    /// [`TofuConflict`] if the fingerprint is bound to a different
    /// identity or the record is marked [`TrustStatus::KeyChanged`].
    fn evaluate(
        &mut self,
        room_id: &str,
        fingerprint: &str,
        peer_id: &str,
        now: u64,
    ) -> Result<TrustStatus, TofuConflict>;

    /// Mark a binding as verified out of band. Returns false if no such
    /// record exists.
    fn mark_verified(&mut self, room_id: &str, fingerprint: &str, now: u64) -> bool;

    /// Flag a binding as changed, rejecting the peer until resolved.
    /// Returns false if no such record exists.
    fn mark_key_changed(&mut self, room_id: &str, fingerprint: &str) -> bool;

    /// Look up a binding.
    fn get(&self, room_id: &str, fingerprint: &str) -> Option<&TofuRecord>;
}

/// In-memory [`TofuStore`].
#[derive(Debug, Default)]
pub struct MemoryTofuStore {
    records: HashMap<(String, String), TofuRecord>,
}

impl MemoryTofuStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TofuStore for MemoryTofuStore {
    fn evaluate(
        &mut self,
        room_id: &str,
        fingerprint: &str,
        peer_id: &str,
        now: u64,
    ) -> Result<TrustStatus, TofuConflict> {
        let key = (room_id.to_owned(), fingerprint.to_owned());

        match self.records.get_mut(&key) {
            None => {
                self.records.insert(key, TofuRecord {
                    peer_id: peer_id.to_owned(),
                    status: TrustStatus::Unverified,
                    first_seen: now,
                    last_seen: now,
                    verified_at: None,
                });
                Ok(TrustStatus::Unverified)
            },
            Some(record) => {
                if record.status == TrustStatus::KeyChanged || record.peer_id != peer_id {
                    return Err(TofuConflict {
                        fingerprint: fingerprint.to_owned(),
                        bound_peer_id: record.peer_id.clone(),
                    });
                }

                if record.status == TrustStatus::Verified {
                    let expired = record
                        .verified_at
                        .is_none_or(|at| at + VERIFIED_TTL_SECS < now);
                    if expired {
                        record.status = TrustStatus::Unverified;
                        record.verified_at = None;
                    }
                }

                record.last_seen = now;
                Ok(record.status)
            },
        }
    }

    fn mark_verified(&mut self, room_id: &str, fingerprint: &str, now: u64) -> bool {
        let key = (room_id.to_owned(), fingerprint.to_owned());
        match self.records.get_mut(&key) {
            Some(record) => {
                record.status = TrustStatus::Verified;
                record.verified_at = Some(now);
                true
            },
            None => false,
        }
    }

    fn mark_key_changed(&mut self, room_id: &str, fingerprint: &str) -> bool {
        let key = (room_id.to_owned(), fingerprint.to_owned());
        match self.records.get_mut(&key) {
            Some(record) => {
                record.status = TrustStatus::KeyChanged;
                true
            },
            None => false,
        }
    }

    fn get(&self, room_id: &str, fingerprint: &str) -> Option<&TofuRecord> {
        self.records.get(&(room_id.to_owned(), fingerprint.to_owned()))
    }
}
