//! Parrhesia Protocol Core
//!
//! Client-side group key agreement and message protection for the
//! Parrhesia messaging system:
//!
//! - [`tree`]: TreeKEM over ML-KEM-768 — a left-balanced binary tree of
//!   ephemeral keypairs whose root secret is the group secret, rotated
//!   by commits and bootstrapped for joiners by targeted welcomes.
//! - [`chain`]: per-sender symmetric chains deriving one-time message
//!   keys, with bounded skipped-key caching for out-of-order delivery.
//! - [`group`]: the [`GroupKeyManager`] tying identity, registry, tree,
//!   and chains together behind the announcement signature discipline.
//! - [`tofu`]: trust-on-first-use fingerprint bindings.
//!
//! # Architecture
//!
//! The core is sans-IO and single-threaded: no sockets, no clocks, no
//! global state. Time and randomness come from an [`Environment`], which
//! lets the whole protocol run deterministically under test. The session
//! layer above feeds frames in and executes the resulting sends.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chain;
pub mod color;
pub mod env;
mod error;
pub mod group;
pub mod tofu;
pub mod tree;

pub use env::{Environment, SystemEnvironment};
pub use error::{ChainError, GroupError, TreeError};
pub use group::{
    GRACE_WINDOW, GroupKeyManager, KeyAnnouncement, OutboundMessage, PeerRecord, RekeyContext,
};
pub use tofu::{MemoryTofuStore, TofuConflict, TofuRecord, TofuStore, TrustStatus};
pub use tree::{MAX_LEAVES, TreeKem};
