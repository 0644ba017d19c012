//! Parrhesia Wire Protocol
//!
//! JSON frame and tree-operation encodings for the Parrhesia messaging
//! core. Every frame is a JSON object with a `type` discriminator; the
//! server relays client-authored frames verbatim and authors the
//! membership frames itself.
//!
//! Binary fields (keys, signatures, sealed payloads) are `Vec<u8>` in
//! Rust and standard padded base64 strings on the wire.
//!
//! This crate performs no cryptography and holds no secrets: it is the
//! structural boundary between the session core and the relay.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod b64;
mod error;
mod frames;
mod rooms;
mod tree;

pub use error::ProtocolError;
pub use frames::{ClientFrame, ServerFrame};
pub use rooms::{CreateRoomResponse, RoomExistsResponse};
pub use tree::{Commit, CommitPathNode, Welcome, WelcomePathSecret};
