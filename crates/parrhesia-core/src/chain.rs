//! Per-sender symmetric chains.
//!
//! Every epoch seeds one chain per participant from the group key. A
//! chain deterministically produces one 32-byte message key per counter:
//!
//! ```text
//! msg_key_n     = HKDF(chain_key_n, "msg")
//! chain_key_n+1 = HKDF(chain_key_n, "chain")
//! ```
//!
//! Receivers that observe a counter gap ratchet forward and cache the
//! skipped message keys (bounded, FIFO) so late messages within the
//! epoch still decrypt. Old chain keys are overwritten as the chain
//! advances, which is what makes the chain forward secure.

use std::collections::{HashMap, VecDeque};

use parrhesia_crypto::{derive_key, labels};
use zeroize::Zeroizing;

use crate::error::ChainError;

/// Maximum number of cached skipped message keys per chain.
pub const MAX_SKIPPED: usize = 100;

/// Maximum forward jump accepted in a single message.
///
/// A counter further ahead than this is treated as garbage rather than
/// ratcheted to, bounding the work a malicious frame can cause.
const MAX_SKIP_AHEAD: u64 = 1_000;

/// A 32-byte message key, zeroized on drop.
pub type MessageKey = Zeroizing<[u8; 32]>;

/// One sender's hash chain within an epoch.
#[derive(Debug, Clone)]
pub struct SenderChain {
    chain_key: Zeroizing<[u8; 32]>,
    next_counter: u64,
    skipped: HashMap<u64, MessageKey>,
    skipped_order: VecDeque<u64>,
}

impl SenderChain {
    /// Start a chain from its epoch seed.
    pub fn new(seed: Zeroizing<[u8; 32]>) -> Self {
        Self {
            chain_key: seed,
            next_counter: 0,
            skipped: HashMap::new(),
            skipped_order: VecDeque::new(),
        }
    }

    /// The counter the next ratchet step will use.
    pub fn next_counter(&self) -> u64 {
        self.next_counter
    }

    /// Number of cached skipped keys.
    pub fn skipped_len(&self) -> usize {
        self.skipped.len()
    }

    /// Advance one step, returning `(counter, message_key)`. Send side.
    pub fn next_message_key(&mut self) -> (u64, MessageKey) {
        let counter = self.next_counter;
        (counter, self.ratchet())
    }

    /// Produce the message key for `counter`. Receive side.
    ///
    /// - At the chain position: one ratchet step.
    /// - Ahead of it: ratchets forward, caching every skipped key.
    /// - Behind it: served from the skipped cache, consuming the entry.
    ///
    /// # Errors
    ///
    /// - [`ChainError::OutOfOrder`] if `counter` is behind and not cached
    /// - [`ChainError::CounterJump`] if `counter` is implausibly far
    ///   ahead
    pub fn message_key(&mut self, counter: u64) -> Result<MessageKey, ChainError> {
        if counter < self.next_counter {
            return match self.skipped.remove(&counter) {
                Some(key) => {
                    self.skipped_order.retain(|&c| c != counter);
                    Ok(key)
                },
                None => Err(ChainError::OutOfOrder { counter }),
            };
        }

        if counter - self.next_counter > MAX_SKIP_AHEAD {
            return Err(ChainError::CounterJump { requested: counter, current: self.next_counter });
        }

        while self.next_counter < counter {
            let skipped_counter = self.next_counter;
            let key = self.ratchet();
            self.cache_skipped(skipped_counter, key);
        }
        Ok(self.ratchet())
    }

    fn ratchet(&mut self) -> MessageKey {
        let message_key = derive_key(self.chain_key.as_ref(), labels::CHAIN_MSG);
        self.chain_key = derive_key(self.chain_key.as_ref(), labels::CHAIN_STEP);
        self.next_counter += 1;
        message_key
    }

    fn cache_skipped(&mut self, counter: u64, key: MessageKey) {
        if self.skipped.len() >= MAX_SKIPPED {
            if let Some(oldest) = self.skipped_order.pop_front() {
                self.skipped.remove(&oldest);
            }
        }
        self.skipped.insert(counter, key);
        self.skipped_order.push_back(counter);
    }
}

/// All chains for one epoch: this member's send chain plus a receive
/// chain per participant (self included, so a member can decrypt its own
/// relayed frames).
#[derive(Debug, Clone)]
pub struct EpochChains {
    epoch: u64,
    send: SenderChain,
    recv: HashMap<String, SenderChain>,
}

impl EpochChains {
    /// Seed chains for a new epoch from the group key.
    ///
    /// Each participant's seed is
    /// `HKDF(group_key, "parrhesia-chain-" ∥ peer_id)`.
    pub fn seed<'a>(
        group_key: &[u8; 32],
        epoch: u64,
        self_id: &str,
        peer_ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut recv = HashMap::new();
        recv.insert(self_id.to_owned(), SenderChain::new(chain_seed(group_key, self_id)));
        for peer_id in peer_ids {
            recv.insert(peer_id.to_owned(), SenderChain::new(chain_seed(group_key, peer_id)));
        }

        Self { epoch, send: SenderChain::new(chain_seed(group_key, self_id)), recv }
    }

    /// Epoch these chains were seeded for.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// This member's send chain.
    pub fn send(&mut self) -> &mut SenderChain {
        &mut self.send
    }

    /// A sender's receive chain.
    pub fn recv(&self, peer_id: &str) -> Option<&SenderChain> {
        self.recv.get(peer_id)
    }

    /// Replace a sender's receive chain (commit-on-success decryption).
    pub fn put_recv(&mut self, peer_id: &str, chain: SenderChain) {
        self.recv.insert(peer_id.to_owned(), chain);
    }

    /// Drop a departed sender's chain.
    pub fn drop_recv(&mut self, peer_id: &str) {
        self.recv.remove(peer_id);
    }
}

fn chain_seed(group_key: &[u8; 32], peer_id: &str) -> Zeroizing<[u8; 32]> {
    let mut info = Vec::with_capacity(labels::CHAIN_PREFIX.len() + peer_id.len());
    info.extend_from_slice(labels::CHAIN_PREFIX);
    info.extend_from_slice(peer_id.as_bytes());
    derive_key(group_key, &info)
}
