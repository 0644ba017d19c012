//! Session state machine.
//!
//! The `Session` is the single-threaded dispatcher between the server
//! connection and the group key manager. It processes one event at a
//! time and returns every resulting outbound send and application
//! callback as an action list.
//!
//! # Rekeying
//!
//! A commit is emitted by exactly one member per trigger — the elected
//! initiator (lexicographically smallest fingerprint among the members
//! that were present before the trigger):
//!
//! - after admitting a joiner (followed by the joiner's targeted
//!   welcome),
//! - after a departure, while peers remain,
//! - after every [`REKEY_INTERVAL`] locally sent messages.
//!
//! A commit observed from a peer resets the interval counter, so the
//! group rotates roughly once per interval regardless of who speaks.
//!
//! # Error policy
//!
//! Non-fatal errors (stale commits, out-of-window epochs, failed
//! authentication, out-of-order counters) drop the offending frame and
//! are logged; the session carries on. Fatal errors destroy all key
//! material and surface a [`SessionAction::RoomClosed`].

use parrhesia_core::{
    Environment, GroupError, GroupKeyManager, RekeyContext, TofuStore,
};
use parrhesia_crypto::SigningKeyPair;
use parrhesia_proto::{ClientFrame, Commit, ServerFrame, Welcome};
use tracing::{debug, warn};

use crate::event::{CloseReason, SessionAction, SessionEvent};

/// Locally sent messages between automatic rekeys.
pub const REKEY_INTERVAL: u64 = 50;

/// One client's membership in one room.
pub struct Session<E: Environment> {
    env: E,
    /// `None` after teardown; every secret lives under the manager.
    manager: Option<GroupKeyManager<E>>,
    is_creator: bool,
    messages_since_rekey: u64,
    closed: bool,
}

impl<E: Environment> Session<E> {
    /// Create a session for a room.
    ///
    /// `identity` is the long-lived signing keypair; the ephemeral KEM
    /// keypair is generated here and never persisted.
    pub fn new(
        env: E,
        room_id: String,
        identity: SigningKeyPair,
        tofu: Box<dyn TofuStore>,
    ) -> Self {
        let manager = GroupKeyManager::new(env.clone(), room_id, identity, tofu);
        Self { env, manager: Some(manager), is_creator: false, messages_since_rekey: 0, closed: false }
    }

    /// True once the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True if this client created the room.
    pub fn is_creator(&self) -> bool {
        self.is_creator
    }

    /// Server-assigned identifier, once known.
    pub fn self_id(&self) -> Option<&str> {
        self.manager.as_ref().and_then(GroupKeyManager::self_id)
    }

    /// Current epoch, once a group key exists.
    pub fn epoch(&self) -> Option<u64> {
        self.manager.as_ref().and_then(GroupKeyManager::epoch)
    }

    /// Number of connected remote peers.
    pub fn peer_count(&self) -> usize {
        self.manager.as_ref().map_or(0, GroupKeyManager::peer_count)
    }

    /// Process one event and return the resulting actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        if self.closed {
            return Vec::new();
        }

        match event {
            SessionEvent::FrameReceived(frame) => self.handle_frame(frame),
            SessionEvent::SendMessage { plaintext } => self.handle_send(&plaintext),
            SessionEvent::Tick => {
                if let Some(manager) = &mut self.manager {
                    manager.tick();
                }
                Vec::new()
            },
            SessionEvent::Disconnected => {
                // Dropping the manager zeroizes the KEM secret key, all
                // chains, and the skipped-key caches.
                self.manager = None;
                self.closed = true;
                Vec::new()
            },
        }
    }

    fn handle_frame(&mut self, frame: ServerFrame) -> Vec<SessionAction> {
        match frame {
            ServerFrame::Welcome { peer_id, is_creator, creator_id } => {
                self.handle_welcome(peer_id, is_creator, &creator_id)
            },
            ServerFrame::PeerKey { peer_id, public_key, pq_public_key, sig }
            | ServerFrame::PeerJoined { peer_id, public_key, pq_public_key, sig } => {
                self.handle_peer_announcement(peer_id, &public_key, &pq_public_key, &sig)
            },
            ServerFrame::PeerLeft { peer_id } => self.handle_peer_left(&peer_id),
            ServerFrame::TreeCommit { tree_commit } => self.handle_commit(&tree_commit),
            ServerFrame::TreeWelcome { target_peer_id, tree_welcome } => {
                self.handle_tree_welcome(&target_peer_id, &tree_welcome)
            },
            ServerFrame::Message { peer_id, payload, epoch, counter, message_id } => {
                self.handle_message(&peer_id, &payload, epoch, counter, message_id)
            },
            ServerFrame::RoomExpired => {
                vec![SessionAction::RoomClosed { reason: CloseReason::Expired }]
            },
            ServerFrame::RoomFull => {
                vec![SessionAction::RoomClosed { reason: CloseReason::Full }]
            },
        }
    }

    fn handle_welcome(
        &mut self,
        peer_id: String,
        is_creator: bool,
        _creator_id: &str,
    ) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };
        manager.set_self_id(peer_id);
        self.is_creator = is_creator;

        let announcement = manager.announce();
        if is_creator {
            if let Err(err) = manager.create_group() {
                return vec![self.fatal(err)];
            }
        }

        vec![SessionAction::Send(ClientFrame::KeyAnnounce {
            public_key: announcement.public_key,
            pq_public_key: announcement.pq_public_key,
            sig: announcement.sig,
        })]
    }

    fn handle_peer_announcement(
        &mut self,
        peer_id: String,
        public_key: &[u8],
        pq_public_key: &[u8],
        sig: &[u8],
    ) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };

        match manager.add_peer(&peer_id, public_key, pq_public_key, sig) {
            Ok(()) => {},
            Err(GroupError::TofuConflict { fingerprint, bound_peer_id }) => {
                warn!(peer_id, %fingerprint, "trust conflict, peer rejected");
                return vec![SessionAction::TofuConflict { peer_id, fingerprint, bound_peer_id }];
            },
            Err(reason) => {
                warn!(peer_id, %reason, "peer rejected");
                return vec![SessionAction::PeerRejected { peer_id, reason }];
            },
        }

        let mut actions = Vec::new();
        if let Some(record) = manager.peer(&peer_id) {
            actions.push(SessionAction::PeerAdded {
                peer_id: peer_id.clone(),
                fingerprint: record.fingerprint.clone(),
                color: record.color,
            });
        }

        // The joiner has no tree yet; existing members rekey if elected.
        if manager.has_group() && manager.should_initiate_rekey(RekeyContext::Add, Some(&peer_id))
        {
            match self.rekey() {
                Ok(commit) => {
                    actions.push(SessionAction::Send(ClientFrame::TreeCommit {
                        tree_commit: commit.encode(),
                    }));
                    match self.welcome_for(&peer_id) {
                        Ok(welcome) => {
                            actions.push(SessionAction::Send(ClientFrame::TreeWelcome {
                                target_peer_id: peer_id,
                                tree_welcome: welcome.encode(),
                            }));
                        },
                        Err(err) => actions.push(self.fatal(err)),
                    }
                },
                Err(err) => actions.push(self.fatal(err)),
            }
        }
        actions
    }

    fn handle_peer_left(&mut self, peer_id: &str) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };

        if let Err(err) = manager.remove_peer(peer_id) {
            debug!(peer_id, %err, "departure for unknown peer dropped");
            return Vec::new();
        }

        let mut actions = vec![SessionAction::PeerRemoved { peer_id: peer_id.to_owned() }];
        if manager.has_group()
            && manager.peer_count() > 0
            && manager.should_initiate_rekey(RekeyContext::Remove, None)
        {
            match self.rekey() {
                Ok(commit) => actions.push(SessionAction::Send(ClientFrame::TreeCommit {
                    tree_commit: commit.encode(),
                })),
                Err(err) => actions.push(self.fatal(err)),
            }
        }
        actions
    }

    fn handle_commit(&mut self, tree_commit: &str) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };
        if !manager.has_group() {
            // A joiner sees the broadcast commit before its targeted
            // welcome; the welcome carries everything it needs.
            debug!("commit before welcome dropped");
            return Vec::new();
        }

        let commit = match Commit::decode(tree_commit) {
            Ok(commit) => commit,
            Err(err) => {
                warn!(%err, "undecodable commit dropped");
                return Vec::new();
            },
        };

        match manager.receive_commit(&commit) {
            Ok(()) => {
                self.messages_since_rekey = 0;
                Vec::new()
            },
            Err(err) if err.is_fatal() => vec![self.fatal(err)],
            Err(err) => {
                debug!(%err, "commit dropped");
                Vec::new()
            },
        }
    }

    fn handle_tree_welcome(&mut self, target_peer_id: &str, tree_welcome: &str) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };
        if manager.self_id() != Some(target_peer_id) || manager.has_group() {
            debug!(target_peer_id, "misdirected welcome dropped");
            return Vec::new();
        }

        let welcome = match Welcome::decode(tree_welcome) {
            Ok(welcome) => welcome,
            Err(err) => {
                warn!(%err, "undecodable welcome dropped");
                return Vec::new();
            },
        };

        match manager.receive_welcome(&welcome) {
            Ok(()) => {
                debug!(epoch = welcome.epoch, "joined group");
                Vec::new()
            },
            Err(err) if err.is_fatal() => vec![self.fatal(err)],
            Err(err) => {
                warn!(%err, "welcome dropped");
                Vec::new()
            },
        }
    }

    fn handle_message(
        &mut self,
        peer_id: &str,
        payload: &[u8],
        epoch: u64,
        counter: u64,
        message_id: Option<String>,
    ) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };

        match manager.decrypt(peer_id, payload, epoch, counter) {
            Ok(plaintext) => vec![SessionAction::Deliver {
                peer_id: peer_id.to_owned(),
                message_id,
                plaintext,
            }],
            Err(err) => {
                debug!(peer_id, epoch, counter, %err, "message dropped");
                Vec::new()
            },
        }
    }

    fn handle_send(&mut self, plaintext: &[u8]) -> Vec<SessionAction> {
        let Some(manager) = &mut self.manager else {
            return Vec::new();
        };

        let outbound = match manager.encrypt(plaintext) {
            Ok(outbound) => outbound,
            Err(err) => {
                warn!(%err, "send before group key dropped");
                return Vec::new();
            },
        };

        self.messages_since_rekey += 1;
        let interval_rekey = self.messages_since_rekey >= REKEY_INTERVAL
            && manager.peer_count() > 0
            && manager.should_initiate_rekey(RekeyContext::Interval, None);

        let message_id = format!("{:032x}", self.env.random_u128());
        let mut actions = vec![SessionAction::Send(ClientFrame::Message {
            payload: outbound.payload,
            epoch: outbound.epoch,
            counter: outbound.counter,
            message_id: Some(message_id),
        })];

        if interval_rekey {
            match self.rekey() {
                Ok(commit) => actions.push(SessionAction::Send(ClientFrame::TreeCommit {
                    tree_commit: commit.encode(),
                })),
                Err(err) => actions.push(self.fatal(err)),
            }
        }
        actions
    }

    fn rekey(&mut self) -> Result<Commit, GroupError> {
        let Some(manager) = &mut self.manager else {
            return Err(GroupError::NotEstablished);
        };
        let commit = manager.initiate_rekey()?;
        self.messages_since_rekey = 0;
        Ok(commit)
    }

    fn welcome_for(&self, peer_id: &str) -> Result<Welcome, GroupError> {
        match &self.manager {
            Some(manager) => manager.generate_welcome_for(peer_id),
            None => Err(GroupError::NotEstablished),
        }
    }

    fn fatal(&mut self, err: GroupError) -> SessionAction {
        warn!(%err, "fatal error, session closed");
        self.manager = None;
        self.closed = true;
        SessionAction::RoomClosed { reason: CloseReason::Fatal(err.to_string()) }
    }
}
