//! TCP networking: length-prefixed framing, JSON wire messages, message
//! routing, and the connection transport.

pub mod framing;
pub mod messages;
pub mod routing;
pub mod tcp_server;

pub use framing::{DEFAULT_MAX_FRAME_BYTES, FrameError, read_frame, write_frame};
pub use messages::{
    BlockAction, BlockUpdate, ClientMessage, InputState, MessageError, MouseMovement, PlayerPose, Position,
    Rotation, ServerMessage, WorldBlocks, decode, encode,
};
pub use routing::{MessageHandler, MessageRouter, MessageTag, drain_events, event_channel};
pub use tcp_server::{
    ConnectionCounter, ConnectionEvent, ConnectionId, ConnectionSlot, GameServer, IdGenerator, Outbound,
    TransportConfig,
};
