//! HKDF-SHA-256 derivation helpers

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Default extraction salt: 32 zero bytes.
const ZERO_SALT: [u8; 32] = [0u8; 32];

/// HKDF-SHA-256 extract-then-expand.
///
/// Fills `okm` with output keying material derived from `ikm` under the
/// given `salt` and `info`.
///
/// # Panics
///
/// Never panics for output lengths up to 255 × 32 bytes; every caller in
/// this workspace requests 32 bytes.
pub fn hkdf_extract_expand(salt: &[u8], ikm: &[u8], info: &[u8], okm: &mut [u8]) {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let Ok(()) = hk.expand(info, okm) else {
        unreachable!("HKDF-SHA256 output length is bounded by callers");
    };
}

/// Derive a 32-byte key from `ikm` under `info`, with the zero salt.
///
/// This is the derivation used throughout the key hierarchy: tree node
/// secrets, the group key, chain seeds, chain steps, and message keys.
pub fn derive_key(ikm: &[u8], info: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf_extract_expand(&ZERO_SALT, ikm, info, okm.as_mut());
    okm
}
