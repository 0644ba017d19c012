//! Password-based key wrapping with PBKDF2-SHA-256 and AES-256-GCM.
//!
//! Used for the persisted signing identity and for sealed message
//! history. The wrapping key never leaves this module; callers hand over
//! a [`Password`] and randomness and receive an opaque envelope.

use zeroize::{Zeroize, Zeroizing};

use crate::{
    aead::{AEAD_IV_LEN, aead_open, aead_seal},
    error::CryptoError,
};

/// PBKDF2-SHA-256 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length for password derivation.
pub const SALT_LEN: usize = 16;

/// A user-supplied password, zeroized on drop.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Wrap a password string.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Password bytes for key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// True if the password is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive a domain-separated sibling password (`self ∥ suffix`).
    ///
    /// Used to seal message history under a key independent from the
    /// identity wrapping key while asking the user for one password.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{suffix}", self.0))
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password").finish_non_exhaustive()
    }
}

/// A password-wrapped secret: PBKDF2 salt, AEAD IV, and sealed bytes.
///
/// Serialization to the persisted JSON shape (base64 fields) is the
/// caller's concern; this struct is the crypto-level envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// PBKDF2 salt.
    pub salt: [u8; SALT_LEN],
    /// AES-GCM IV used for the wrap.
    pub iv: [u8; AEAD_IV_LEN],
    /// `ct ∥ tag` over the wrapped secret.
    pub ciphertext: Vec<u8>,
}

/// Derive a 256-bit wrapping key from a password and salt.
pub fn derive_wrapping_key(password: &Password, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
        password.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        key.as_mut(),
    );
    key
}

/// Wrap `secret` under `password`. Salt and IV are caller-supplied random
/// bytes, fresh per wrap.
pub fn wrap_key(
    secret: &[u8],
    password: &Password,
    salt: [u8; SALT_LEN],
    iv: [u8; AEAD_IV_LEN],
) -> WrappedKey {
    let key = derive_wrapping_key(password, &salt);
    let sealed = aead_seal(&key, iv, secret);
    // aead_seal prefixes the IV; the envelope stores it separately.
    WrappedKey { salt, iv, ciphertext: sealed[AEAD_IV_LEN..].to_vec() }
}

/// Unwrap a [`WrappedKey`].
///
/// # Errors
///
/// [`CryptoError::PasswordUnwrap`] on a wrong password or corrupted
/// envelope.
pub fn unwrap_key(wrapped: &WrappedKey, password: &Password) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = derive_wrapping_key(password, &wrapped.salt);

    let mut sealed = Vec::with_capacity(AEAD_IV_LEN + wrapped.ciphertext.len());
    sealed.extend_from_slice(&wrapped.iv);
    sealed.extend_from_slice(&wrapped.ciphertext);

    aead_open(&key, &sealed).map(Zeroizing::new).map_err(|_| CryptoError::PasswordUnwrap)
}
