//! TCP transport: accepts connections and bridges them to the simulation.
//!
//! Each accepted socket gets a reader task and a writer task. The reader
//! decodes frames into [`ClientMessage`]s and forwards them as
//! [`ConnectionEvent`]s on a shared bounded channel. The writer drains a
//! per-connection [`Outbound`] queue whose sender is handed to the
//! simulation in [`ConnectionEvent::Connected`].

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::framing::{DEFAULT_MAX_FRAME_BYTES, FrameError, read_frame, write_frame};
use crate::messages::{ClientMessage, decode};

/// Unique identifier for a TCP connection within a server run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Atomic generator for monotonically increasing [`ConnectionId`]s.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Events and outbound commands
// ---------------------------------------------------------------------------

/// A command for a connection's writer task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// An encoded payload, shared between every recipient of a broadcast.
    Frame(Arc<[u8]>),
    /// Flush what is queued ahead of this, then close the socket.
    Close,
}

/// Something that happened on a connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A socket was accepted. `outbound` feeds its writer task.
    Connected {
        id: ConnectionId,
        peer: SocketAddr,
        outbound: mpsc::Sender<Outbound>,
    },
    /// A well-formed message arrived.
    Message { id: ConnectionId, message: ClientMessage },
    /// The socket is gone (EOF, I/O error, oversized frame or shutdown).
    Disconnected { id: ConnectionId },
}

impl ConnectionEvent {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            ConnectionEvent::Connected { id, .. }
            | ConnectionEvent::Message { id, .. }
            | ConnectionEvent::Disconnected { id } => *id,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection limit
// ---------------------------------------------------------------------------

/// Counts live connections against a fixed limit.
#[derive(Debug)]
pub struct ConnectionCounter {
    active: AtomicUsize,
    max: usize,
}

/// A held connection slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct ConnectionSlot {
    counter: Arc<ConnectionCounter>,
}

impl ConnectionCounter {
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            max,
        })
    }

    /// Claim a slot, or `None` if the limit is reached.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionSlot> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.max).then_some(n + 1))
            .ok()
            .map(|_| ConnectionSlot {
                counter: Arc::clone(self),
            })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::AcqRel);
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Transport settings for [`GameServer`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum concurrent connections. Extra sockets are closed at accept.
    pub max_connections: usize,
    /// Largest frame payload accepted or sent.
    pub max_frame_bytes: u32,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections: 64,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_queue: 256,
        }
    }
}

/// TCP server that accepts connections and manages their tasks.
pub struct GameServer {
    config: TransportConfig,
    events: mpsc::Sender<ConnectionEvent>,
    connections: Arc<ConnectionCounter>,
    id_gen: Arc<IdGenerator>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GameServer {
    /// Create a server that reports connection events on `events`.
    pub fn new(config: TransportConfig, events: mpsc::Sender<ConnectionEvent>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            connections: ConnectionCounter::new(config.max_connections),
            id_gen: Arc::new(IdGenerator::new()),
            config,
            events,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Run the accept loop with a pre-bound listener until shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!("Accept failed: {e}");
                            continue;
                        }
                    };

                    let Some(slot) = self.connections.try_acquire() else {
                        tracing::warn!("Connection limit {} reached, rejecting {peer}", self.config.max_connections);
                        continue;
                    };
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("set_nodelay failed for {peer}: {e}");
                    }

                    let id = self.id_gen.next_id();
                    tracing::info!("Accepted {id} from {peer}");

                    tokio::spawn(handle_connection(
                        id,
                        peer,
                        stream,
                        self.events.clone(),
                        self.config.clone(),
                        self.shutdown_rx.clone(),
                        slot,
                    ));
                }
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Signal the server and every connection task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// A receiver that flips to `true` on [`shutdown`](Self::shutdown).
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of live connections.
    pub fn active_connections(&self) -> usize {
        self.connections.active()
    }
}

async fn handle_connection(
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    events: mpsc::Sender<ConnectionEvent>,
    config: TransportConfig,
    shutdown: watch::Receiver<bool>,
    _slot: ConnectionSlot,
) {
    let (reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue.max(1));

    let connected = ConnectionEvent::Connected {
        id,
        peer,
        outbound: outbound_tx,
    };
    if events.send(connected).await.is_err() {
        tracing::debug!("Simulation gone, dropping {id}");
        return;
    }

    let mut writer_task = tokio::spawn(write_loop(
        id,
        writer,
        outbound_rx,
        config.max_frame_bytes,
        shutdown.clone(),
    ));

    let writer_done = tokio::select! {
        _ = read_loop(id, reader, &events, config.max_frame_bytes, shutdown) => false,
        _ = &mut writer_task => true,
    };

    // The peer is gone; drop the outbound receiver now so the simulation
    // sees a closed queue even before it drains `Disconnected`.
    if !writer_done {
        writer_task.abort();
        let _ = writer_task.await;
    }
    let _ = events.send(ConnectionEvent::Disconnected { id }).await;
    tracing::info!("{id} closed");
}

async fn read_loop(
    id: ConnectionId,
    mut reader: OwnedReadHalf,
    events: &mpsc::Sender<ConnectionEvent>,
    max_frame_bytes: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader, max_frame_bytes) => frame,
            _ = shutdown.wait_for(|stop| *stop) => return,
        };

        let payload = match frame {
            Ok(payload) => payload,
            Err(FrameError::ConnectionClosed) => return,
            Err(e) => {
                tracing::debug!("{id} read failed: {e}");
                return;
            }
        };
        if payload.is_empty() {
            continue;
        }

        match decode::<ClientMessage>(&payload) {
            Ok(message) => {
                tracing::trace!("{id} -> {:?}", message.tag());
                if events.send(ConnectionEvent::Message { id, message }).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::debug!("Ignoring malformed message from {id}: {e}"),
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Outbound>,
    max_frame_bytes: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let command = tokio::select! {
            command = outbound.recv() => command,
            _ = shutdown.wait_for(|stop| *stop) => break,
        };
        match command {
            Some(Outbound::Frame(payload)) => {
                match write_frame(&mut writer, &payload, max_frame_bytes).await {
                    Ok(()) => {}
                    Err(e @ FrameError::PayloadTooLarge { .. }) => {
                        tracing::warn!("{id} outbound frame rejected, closing: {e}");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("{id} write failed: {e}");
                        break;
                    }
                }
            }
            Some(Outbound::Close) | None => break,
        }
    }
    let _ = writer.shutdown().await;
}
