//! Transport frames.
//!
//! Every frame is a JSON object tagged by a `type` field. Two enums cover
//! the two directions: [`ServerFrame`] is what a client receives (server
//! authored, or client authored and relayed with the sender's `peer_id`
//! attached), [`ClientFrame`] is what a client sends.
//!
//! # Protocol Flow
//!
//! 1. On connect, the server sends `welcome` assigning the client its
//!    `peer_id` and telling it whether it created the room.
//! 2. The client responds with `key_announce` carrying its signing key,
//!    its ephemeral KEM key, and a signature binding the two.
//! 3. The server replays existing members to the joiner as `peer_key` and
//!    broadcasts the joiner to existing members as `peer_joined`.
//! 4. Group key agreement runs over relayed `tree_commit` and targeted
//!    `tree_welcome` frames; application traffic over `message` frames.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, b64};

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Session start: the server assigns this client its identity.
    Welcome {
        /// Server-assigned identifier for this client.
        peer_id: String,
        /// True if this client created the room.
        is_creator: bool,
        /// Identifier of the room creator.
        creator_id: String,
    },

    /// An existing member's announced keys, delivered to a joiner.
    PeerKey {
        /// The existing member's identifier.
        peer_id: String,
        /// ML-DSA-65 signing public key.
        #[serde(with = "b64")]
        public_key: Vec<u8>,
        /// ML-KEM-768 public key.
        #[serde(with = "b64")]
        pq_public_key: Vec<u8>,
        /// ML-DSA-65 signature over `pq_public_key`.
        #[serde(with = "b64")]
        sig: Vec<u8>,
    },

    /// A new arrival's announced keys, broadcast to existing members.
    PeerJoined {
        /// The new member's identifier.
        peer_id: String,
        /// ML-DSA-65 signing public key.
        #[serde(with = "b64")]
        public_key: Vec<u8>,
        /// ML-KEM-768 public key.
        #[serde(with = "b64")]
        pq_public_key: Vec<u8>,
        /// ML-DSA-65 signature over `pq_public_key`.
        #[serde(with = "b64")]
        sig: Vec<u8>,
    },

    /// A member disconnected.
    PeerLeft {
        /// The departed member's identifier.
        peer_id: String,
    },

    /// A relayed key-rotation commit.
    TreeCommit {
        /// JSON-encoded [`Commit`](crate::Commit) document.
        tree_commit: String,
    },

    /// A targeted welcome initializing a joiner's tree view.
    TreeWelcome {
        /// The joiner this welcome is addressed to.
        target_peer_id: String,
        /// JSON-encoded [`Welcome`](crate::Welcome) document.
        tree_welcome: String,
    },

    /// A relayed application message.
    Message {
        /// The sender's identifier (attached by the relay).
        peer_id: String,
        /// Sealed payload: `iv ∥ ct ∥ tag`.
        #[serde(with = "b64")]
        payload: Vec<u8>,
        /// Epoch the message was encrypted under.
        epoch: u64,
        /// The sender's chain counter for this message.
        counter: u64,
        /// Optional sender-chosen correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    /// The room reached its lifetime limit. No crypto effect.
    RoomExpired,

    /// The room is at capacity. No crypto effect.
    RoomFull,
}

/// A frame sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Announce this client's keys after the server welcome.
    KeyAnnounce {
        /// ML-DSA-65 signing public key.
        #[serde(with = "b64")]
        public_key: Vec<u8>,
        /// ML-KEM-768 public key.
        #[serde(with = "b64")]
        pq_public_key: Vec<u8>,
        /// ML-DSA-65 signature over `pq_public_key`.
        #[serde(with = "b64")]
        sig: Vec<u8>,
    },

    /// Broadcast a key-rotation commit.
    TreeCommit {
        /// JSON-encoded [`Commit`](crate::Commit) document.
        tree_commit: String,
    },

    /// Send a targeted welcome to a joiner.
    TreeWelcome {
        /// The joiner this welcome is addressed to.
        target_peer_id: String,
        /// JSON-encoded [`Welcome`](crate::Welcome) document.
        tree_welcome: String,
    },

    /// Send an application message.
    Message {
        /// Sealed payload: `iv ∥ ct ∥ tag`.
        #[serde(with = "b64")]
        payload: Vec<u8>,
        /// Epoch the message was encrypted under.
        epoch: u64,
        /// This sender's chain counter.
        counter: u64,
        /// Optional correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
}

impl ServerFrame {
    /// Decode a received frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the JSON does not match any frame
    /// schema.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::malformed("server frame", e))
    }

    /// Encode for the wire. Used by test relays; production servers author
    /// these frames themselves.
    pub fn encode(&self) -> String {
        let Ok(json) = serde_json::to_string(self) else {
            unreachable!("frame serialization cannot fail");
        };
        json
    }
}

impl ClientFrame {
    /// Encode for the wire.
    pub fn encode(&self) -> String {
        let Ok(json) = serde_json::to_string(self) else {
            unreachable!("frame serialization cannot fail");
        };
        json
    }

    /// Decode a client frame (relay side, or test harnesses).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the JSON does not match any frame
    /// schema.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::malformed("client frame", e))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn welcome_wire_shape() {
        let frame = ServerFrame::Welcome {
            peer_id: "p1".into(),
            is_creator: true,
            creator_id: "p1".into(),
        };
        let json = frame.encode();
        assert!(json.contains(r#""type":"welcome""#));
        assert_eq!(ServerFrame::decode(&json).unwrap(), frame);
    }

    #[test]
    fn message_without_id_omits_field() {
        let frame = ClientFrame::Message {
            payload: vec![1, 2, 3],
            epoch: 4,
            counter: 7,
            message_id: None,
        };
        assert!(!frame.encode().contains("message_id"));
    }

    #[test]
    fn unit_frames_decode() {
        assert_eq!(
            ServerFrame::decode(r#"{"type":"room_expired"}"#).unwrap(),
            ServerFrame::RoomExpired
        );
        assert_eq!(
            ServerFrame::decode(r#"{"type":"room_full"}"#).unwrap(),
            ServerFrame::RoomFull
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(ServerFrame::decode(r#"{"type":"subliminal"}"#).is_err());
    }

    #[test]
    fn missing_field_is_rejected() {
        assert!(ServerFrame::decode(r#"{"type":"peer_left"}"#).is_err());
    }

    proptest! {
        #[test]
        fn message_frame_round_trip(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            epoch in any::<u64>(),
            counter in any::<u64>(),
        ) {
            let frame = ServerFrame::Message {
                peer_id: "peer".into(),
                payload,
                epoch,
                counter,
                message_id: Some("m-1".into()),
            };
            let decoded = ServerFrame::decode(&frame.encode()).unwrap();
            prop_assert_eq!(frame, decoded);
        }

        #[test]
        fn key_announce_round_trip(
            public_key in proptest::collection::vec(any::<u8>(), 0..64),
            pq_public_key in proptest::collection::vec(any::<u8>(), 0..64),
            sig in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let frame = ClientFrame::KeyAnnounce { public_key, pq_public_key, sig };
            let decoded = ClientFrame::decode(&frame.encode()).unwrap();
            prop_assert_eq!(frame, decoded);
        }
    }
}
