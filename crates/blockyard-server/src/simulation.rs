//! The authoritative simulation task.
//!
//! Each tick:
//!
//! 1. drain up to `drain_budget` connection events and apply them
//! 2. advance every session's physics by one fixed step
//! 3. send the resulting `positions` snapshot to every joined connection
//!
//! Disconnects are applied in step 1, so a tick never reports a player
//! whose connection has already gone.

use blockyard_config::SimulationConfig;
use blockyard_net::{ConnectionEvent, MessageRouter, ServerMessage, drain_events};
use blockyard_physics::step;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::gateway::{build_router, connection_closed, connection_opened, message_received};
use crate::server::ServerContext;
use crate::tick::TickSchedule;

/// Owns the server state and the inbound event queue.
pub struct Simulation {
    ctx: ServerContext,
    router: MessageRouter<ServerContext>,
    events: mpsc::Receiver<ConnectionEvent>,
    schedule: TickSchedule,
    drain_budget: usize,
}

impl Simulation {
    pub fn new(ctx: ServerContext, events: mpsc::Receiver<ConnectionEvent>, config: &SimulationConfig) -> Self {
        Self {
            ctx,
            router: build_router(),
            events,
            schedule: TickSchedule::with_tick_rate(config.tick_rate),
            drain_budget: config.drain_budget.max(1),
        }
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Run one tick. Returns the number of events processed.
    pub fn tick(&mut self) -> usize {
        let ctx = &mut self.ctx;
        let router = &self.router;
        let processed = drain_events(&mut self.events, self.drain_budget, |event| {
            dispatch(ctx, router, event);
        });

        step_sessions(&mut self.ctx, self.schedule.dt());
        broadcast_positions(&self.ctx);
        processed
    }

    /// Tick at the configured rate until `shutdown` flips to `true`.
    ///
    /// Dropping the context on return closes every outbound queue.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = self.schedule.interval();
        info!(
            "Simulation running at {:.0} Hz",
            1.0 / self.schedule.tick_duration().as_secs_f64()
        );

        loop {
            tokio::select! {
                now = interval.tick() => {
                    let skipped = self.schedule.record(now);
                    if skipped > 0 {
                        warn!("Simulation fell behind, skipped {skipped} tick(s)");
                    }
                    self.tick();
                }
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!(
            "Simulation stopped after {} ticks ({} skipped), {} session(s) dropped",
            self.schedule.total_ticks(),
            self.schedule.skipped_ticks(),
            self.ctx.sessions.len()
        );
    }
}

fn dispatch(ctx: &mut ServerContext, router: &MessageRouter<ServerContext>, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Connected { id, peer, outbound } => connection_opened(ctx, id, peer, outbound),
        ConnectionEvent::Message { id, message } => {
            message_received(ctx, router, id, message);
        }
        ConnectionEvent::Disconnected { id } => connection_closed(ctx, id),
    }
}

/// Advance every session by `dt` seconds using its buffered input.
pub fn step_sessions(ctx: &mut ServerContext, dt: f32) {
    let world = &ctx.world;
    for session in ctx.sessions.iter_mut() {
        step(&mut session.body, &session.input, world, dt);
    }
}

/// Send every joined connection the current poses. Returns the number of
/// recipients.
///
/// Sessions whose socket has already closed are left out even if their
/// `Disconnected` event is still queued behind the drain budget.
pub fn broadcast_positions(ctx: &ServerContext) -> usize {
    if ctx.sessions.is_empty() {
        return 0;
    }
    let positions = ServerMessage::Positions {
        positions: ctx.sessions.poses(|conn| ctx.broadcaster.is_live(conn)),
    };
    ctx.broadcaster.broadcast(&positions, None)
}
