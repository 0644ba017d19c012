//! Session events and actions.

use parrhesia_core::GroupError;
use parrhesia_proto::{ClientFrame, ServerFrame};

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Receiving frames from the server connection
/// - Driving time forward via ticks
/// - Forwarding application intents
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Frame received from the server.
    FrameReceived(ServerFrame),

    /// The user wants to send a message.
    SendMessage {
        /// Message plaintext.
        plaintext: Vec<u8>,
    },

    /// Periodic timer tick for housekeeping (grace-window expiry).
    Tick,

    /// The connection dropped. All key material is destroyed.
    Disconnected,
}

/// Why the session ended or surfaced a room-level status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server reported the room expired.
    Expired,
    /// The server reported the room is full.
    Full,
    /// An unrecoverable local error.
    Fatal(String),
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Send a frame to the server.
    Send(ClientFrame),

    /// Deliver a decrypted message to the application.
    Deliver {
        /// Sender of the message.
        peer_id: String,
        /// Correlation id, if the sender attached one.
        message_id: Option<String>,
        /// Decrypted plaintext.
        plaintext: Vec<u8>,
    },

    /// A peer was admitted to the room.
    PeerAdded {
        /// The admitted peer.
        peer_id: String,
        /// The peer's identity fingerprint.
        fingerprint: String,
        /// The peer's display color.
        color: &'static str,
    },

    /// A peer left the room.
    PeerRemoved {
        /// The departed peer.
        peer_id: String,
    },

    /// A peer's announcement was rejected.
    PeerRejected {
        /// The rejected peer.
        peer_id: String,
        /// Why it was rejected.
        reason: GroupError,
    },

    /// A fingerprint arrived bound to a different identity. The peer is
    /// rejected; a human must resolve the conflict.
    TofuConflict {
        /// The peer claiming the fingerprint.
        peer_id: String,
        /// The conflicting fingerprint.
        fingerprint: String,
        /// The identity the fingerprint was first bound to.
        bound_peer_id: String,
    },

    /// The room ended or refused entry.
    RoomClosed {
        /// Why.
        reason: CloseReason,
    },
}
