//! Authoritative multiplayer voxel sandbox server.
//!
//! One simulation task owns the world and every session. Connection tasks
//! feed it decoded client messages; it applies them, steps player physics at
//! a fixed rate, and fans results back out through per-connection queues.

pub mod broadcast;
pub mod gateway;
pub mod server;
pub mod session;
pub mod simulation;
pub mod tick;

pub use broadcast::Broadcaster;
pub use server::{ServerContext, ServerError, run, serve};
pub use session::{JoinError, Session, SessionRegistry};
pub use simulation::Simulation;
pub use tick::TickSchedule;
