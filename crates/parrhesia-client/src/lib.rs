//! Parrhesia Client
//!
//! Session state machine for the Parrhesia messaging core. The session
//! follows a Sans-IO, action-based pattern: the caller feeds it events
//! ([`SessionEvent`]) — received frames, send intents, timer ticks — and
//! executes the actions ([`SessionAction`]) it returns. The session owns
//! the [`parrhesia_core::GroupKeyManager`] and drives rekeying: a commit
//! on every membership change and after every 50 sent messages, always
//! from the deterministically elected initiator.
//!
//! The crate also covers the client's persisted state: the long-lived
//! signing identity (optionally password-wrapped) and encrypted message
//! history.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod history;
mod identity;
mod session;

pub use error::ClientError;
pub use event::{CloseReason, SessionAction, SessionEvent};
pub use history::{MessageRecord, open_history, seal_history};
pub use identity::{StoredIdentity, load_identity, store_identity};
pub use session::{REKEY_INTERVAL, Session};
