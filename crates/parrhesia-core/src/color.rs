//! Deterministic peer display colors.
//!
//! Every participant derives the same color assignment from the same
//! member set, with no coordination: each identity prefers the palette
//! slot picked by a hash of its signing key, and collisions are resolved
//! by assigning identities in lexicographic fingerprint order, each
//! probing forward from its preferred slot to the first free one.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Display palette. One slot per possible room member.
pub const PALETTE: [&str; 16] = [
    "crimson", "teal", "indigo", "amber", "emerald", "violet", "rose", "cyan", "lime", "fuchsia",
    "sky", "orange", "mint", "plum", "coral", "slate",
];

/// The palette slot an identity prefers, from a SHA-256 of its signing
/// public key.
pub fn preferred_slot(signing_public_key: &[u8]) -> usize {
    let digest = Sha256::digest(signing_public_key);
    usize::from(digest[0]) % PALETTE.len()
}

/// Assign a color to every identity in `members`.
///
/// `members` pairs each fingerprint with its signing public key bytes.
/// The assignment is a pure function of the member set, so every honest
/// participant computes the same map.
pub fn assign_colors<'a>(
    members: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> HashMap<String, &'static str> {
    let mut ordered: Vec<(&str, usize)> =
        members.into_iter().map(|(fp, key)| (fp, preferred_slot(key))).collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    let mut taken = [false; PALETTE.len()];
    let mut assigned = HashMap::with_capacity(ordered.len());
    for (fingerprint, preferred) in ordered {
        let mut slot = preferred;
        while taken[slot] {
            slot = (slot + 1) % PALETTE.len();
        }
        taken[slot] = true;
        assigned.insert(fingerprint.to_owned(), PALETTE[slot]);
    }
    assigned
}
