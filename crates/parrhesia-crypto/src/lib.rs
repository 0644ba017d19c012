//! Parrhesia Cryptographic Primitives
//!
//! Post-quantum building blocks for the Parrhesia messaging core. Pure
//! functions with deterministic outputs; callers provide random bytes
//! (AEAD IVs, salts) so protocol logic stays deterministically testable.
//!
//! # Key Hierarchy
//!
//! ```text
//! TreeKEM root secret
//!        │
//!        ▼
//! HKDF("parrhesia-tree-root") → 256-bit group key (per epoch)
//!        │
//!        ▼
//! HKDF("parrhesia-chain-" ∥ peer_id) → per-sender chain key
//!        │
//!        ▼
//! Symmetric chain → one-time message keys
//!        │
//!        ▼
//! AES-256-GCM → ciphertext (iv ∥ ct ∥ tag)
//! ```
//!
//! # Algorithms
//!
//! - KEM: ML-KEM-768 (FIPS 203) — public key 1184 B, ciphertext 1088 B,
//!   shared secret 32 B
//! - Signatures: ML-DSA-65 (FIPS 204) — public key 1952 B, secret key
//!   4032 B
//! - AEAD: AES-256-GCM with a 96-bit IV prepended to the ciphertext
//! - KDF: HKDF-SHA-256; PBKDF2-SHA-256 (600 000 iterations) for password
//!   wrapping only
//!
//! # Security
//!
//! - All secret material (chain keys, node secrets, KEM/signing secret
//!   keys, passwords) is zeroized on drop.
//! - Key and signature byte strings are validated for exact length at
//!   construction; malformed material never reaches the underlying
//!   implementations.
//! - Decapsulation follows implicit-rejection semantics: callers must not
//!   treat a successful decapsulation as authentication.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod error;
mod hkdf;
mod kem;
mod password;
mod sign;

pub mod labels;

pub use aead::{AEAD_IV_LEN, AEAD_KEY_LEN, AEAD_TAG_LEN, aead_open, aead_seal};
pub use error::CryptoError;
pub use hkdf::{hkdf_extract_expand, derive_key};
pub use kem::{
    KEM_CIPHERTEXT_LEN, KEM_PUBLIC_KEY_LEN, KEM_SECRET_KEY_LEN, KemKeyPair, KemPublicKey,
    KemSecretKey, SHARED_SECRET_LEN, SharedSecret, encapsulate,
};
pub use password::{
    PBKDF2_ITERATIONS, Password, SALT_LEN, WrappedKey, derive_wrapping_key, unwrap_key, wrap_key,
};
pub use sign::{
    SIGNATURE_LEN, SIGNING_PUBLIC_KEY_LEN, SIGNING_SECRET_KEY_LEN, SigningKeyPair,
    SigningPublicKey, SigningSecretKey, sign, verify,
};
