//! Outbound fan-out to connections.
//!
//! Messages are encoded once and the payload is shared between recipients.
//! Queues are bounded; a full queue drops the frame for that recipient
//! rather than stalling the simulation.

use std::collections::BTreeMap;
use std::sync::Arc;

use blockyard_net::{ConnectionId, Outbound, ServerMessage, encode};
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug)]
struct Peer {
    outbound: mpsc::Sender<Outbound>,
    /// Only joined peers receive broadcasts.
    joined: bool,
    /// A close has been queued; nothing more is sent or accepted.
    closing: bool,
}

/// Per-connection outbound queues.
#[derive(Debug, Default)]
pub struct Broadcaster {
    peers: BTreeMap<ConnectionId, Peer>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection's outbound queue.
    pub fn register(&mut self, id: ConnectionId, outbound: mpsc::Sender<Outbound>) {
        self.peers.insert(
            id,
            Peer {
                outbound,
                joined: false,
                closing: false,
            },
        );
    }

    /// Forget a connection. Dropping the sender lets its writer finish.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.peers.remove(&id).is_some()
    }

    /// Include `id` in future broadcasts.
    pub fn mark_joined(&mut self, id: ConnectionId) {
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.joined = true;
        }
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Whether messages from `id` should still be acted on: registered, not
    /// closing, and its writer still draining the queue.
    pub fn is_live(&self, id: ConnectionId) -> bool {
        self.peers
            .get(&id)
            .is_some_and(|peer| !peer.closing && !peer.outbound.is_closed())
    }

    /// Send `msg` to one connection. Returns whether it was queued.
    pub fn send_to(&self, id: ConnectionId, msg: &ServerMessage) -> bool {
        let Some(peer) = self.peers.get(&id).filter(|peer| !peer.closing) else {
            return false;
        };
        let Some(payload) = encode_shared(msg) else {
            return false;
        };
        push(id, &peer.outbound, Outbound::Frame(payload))
    }

    /// Send `msg` to every joined connection except `exclude`. Returns the
    /// number of recipients it was queued for.
    pub fn broadcast(&self, msg: &ServerMessage, exclude: Option<ConnectionId>) -> usize {
        let Some(payload) = encode_shared(msg) else {
            return 0;
        };
        let mut queued = 0;
        for (&id, peer) in &self.peers {
            if !peer.joined || peer.closing || Some(id) == exclude {
                continue;
            }
            if push(id, &peer.outbound, Outbound::Frame(Arc::clone(&payload))) {
                queued += 1;
            }
        }
        queued
    }

    /// Close `id` after anything already queued for it has been written.
    pub fn close(&mut self, id: ConnectionId) {
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        peer.closing = true;
        if peer.outbound.try_send(Outbound::Close).is_err() {
            // Queue full or writer gone: dropping the sender ends the writer
            // once it drains.
            self.peers.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn encode_shared(msg: &ServerMessage) -> Option<Arc<[u8]>> {
    match encode(msg) {
        Ok(bytes) => Some(Arc::from(bytes)),
        Err(e) => {
            tracing::warn!("Failed to encode {msg:?}: {e}");
            None
        }
    }
}

fn push(id: ConnectionId, outbound: &mpsc::Sender<Outbound>, command: Outbound) -> bool {
    match outbound.try_send(command) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!("Outbound queue full for {id}, dropping frame");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::trace!("Outbound queue closed for {id}");
            false
        }
    }
}
