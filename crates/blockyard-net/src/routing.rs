//! Message routing: dispatch decoded client messages to handlers.
//!
//! The [`MessageRouter`] maps [`MessageTag`] values to [`MessageHandler`]
//! implementations that mutate a caller-owned context `C`. Events arrive from
//! connection tasks on a bounded [`tokio::sync::mpsc`] channel and are
//! drained once per tick by [`drain_events`].

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::messages::ClientMessage;
use crate::tcp_server::{ConnectionEvent, ConnectionId};

// ---------------------------------------------------------------------------
// MessageTag
// ---------------------------------------------------------------------------

/// Routing key for each client message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    Join,
    Input,
    BlockAction,
    BlockUpdate,
}

impl ClientMessage {
    /// Extract the routing tag without consuming the message.
    pub fn tag(&self) -> MessageTag {
        match self {
            ClientMessage::Join { .. } => MessageTag::Join,
            ClientMessage::Input { .. } => MessageTag::Input,
            ClientMessage::BlockAction { .. } => MessageTag::BlockAction,
            ClientMessage::BlockUpdate(_) => MessageTag::BlockUpdate,
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Processes one message on behalf of connection `from`.
pub trait MessageHandler<C>: Send + Sync {
    fn handle(&self, ctx: &mut C, from: ConnectionId, msg: ClientMessage);
}

impl<C, F> MessageHandler<C> for F
where
    F: Fn(&mut C, ConnectionId, ClientMessage) + Send + Sync,
{
    fn handle(&self, ctx: &mut C, from: ConnectionId, msg: ClientMessage) {
        self(ctx, from, msg);
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes client messages to registered handlers by [`MessageTag`].
pub struct MessageRouter<C> {
    handlers: HashMap<MessageTag, Box<dyn MessageHandler<C>>>,
}

impl<C> MessageRouter<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `tag`, replacing any previous handler.
    pub fn register<H: MessageHandler<C> + 'static>(&mut self, tag: MessageTag, handler: H) {
        self.handlers.insert(tag, Box::new(handler));
    }

    /// Dispatch `msg`. Returns `false` if no handler is registered for it.
    pub fn route(&self, ctx: &mut C, from: ConnectionId, msg: ClientMessage) -> bool {
        let tag = msg.tag();
        match self.handlers.get(&tag) {
            Some(handler) => {
                handler.handle(ctx, from, msg);
                true
            }
            None => {
                tracing::debug!("No handler registered for {:?} from {}, dropping", tag, from);
                false
            }
        }
    }

    pub fn registered_tags(&self) -> impl Iterator<Item = &MessageTag> {
        self.handlers.keys()
    }
}

impl<C> Default for MessageRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Channel bridge
// ---------------------------------------------------------------------------

/// Create the bounded channel connection tasks use to reach the simulation.
pub fn event_channel(buffer: usize) -> (mpsc::Sender<ConnectionEvent>, mpsc::Receiver<ConnectionEvent>) {
    mpsc::channel(buffer.max(1))
}

/// Pass up to `budget` pending events to `on_event` without waiting.
/// Anything beyond the budget stays queued for the next call.
///
/// Returns the number of events processed.
pub fn drain_events<F>(receiver: &mut mpsc::Receiver<ConnectionEvent>, budget: usize, mut on_event: F) -> usize
where
    F: FnMut(ConnectionEvent),
{
    let mut processed = 0;
    while processed < budget {
        match receiver.try_recv() {
            Ok(event) => {
                on_event(event);
                processed += 1;
            }
            Err(_) => break,
        }
    }
    processed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
