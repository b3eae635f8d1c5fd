//! Protocol handlers: what each client message does to the server state.

use std::net::SocketAddr;

use blockyard_net::{
    BlockUpdate, ClientMessage, ConnectionId, MessageRouter, MessageTag, Outbound, ServerMessage, WorldBlocks,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::server::ServerContext;
use crate::session::{JoinError, player_input};

/// Router with a handler for every client message.
pub fn build_router() -> MessageRouter<ServerContext> {
    let mut router = MessageRouter::new();
    router.register(MessageTag::Join, handle_join);
    router.register(MessageTag::Input, handle_input);
    router.register(MessageTag::BlockAction, handle_block_action);
    router.register(MessageTag::BlockUpdate, handle_block_update);
    router
}

/// A socket was accepted; start tracking its outbound queue.
pub fn connection_opened(ctx: &mut ServerContext, id: ConnectionId, peer: SocketAddr, outbound: mpsc::Sender<Outbound>) {
    debug!("{id} opened from {peer}");
    ctx.broadcaster.register(id, outbound);
}

/// A socket is gone. Removes its session, if any, and tells the others.
pub fn connection_closed(ctx: &mut ServerContext, id: ConnectionId) {
    ctx.broadcaster.unregister(id);
    if let Some(session) = ctx.sessions.leave(id) {
        info!("{} left ({} online)", session.username, ctx.sessions.len());
        ctx.broadcaster.broadcast(
            &ServerMessage::PlayerLeft {
                username: session.username,
            },
            None,
        );
    }
}

/// Route a decoded client message. Messages from a connection that is being
/// closed, or whose writer has already gone, are dropped unrouted.
pub fn message_received(
    ctx: &mut ServerContext,
    router: &MessageRouter<ServerContext>,
    from: ConnectionId,
    message: ClientMessage,
) -> bool {
    if !ctx.broadcaster.is_live(from) {
        debug!("Ignoring {:?} from closing {from}", message.tag());
        return false;
    }
    router.route(ctx, from, message)
}

fn handle_join(ctx: &mut ServerContext, from: ConnectionId, msg: ClientMessage) {
    let ClientMessage::Join { username } = msg else {
        return;
    };

    match ctx.sessions.join(from, &username, ctx.spawn) {
        Ok(_) => {}
        Err(JoinError::AlreadyJoined(current)) => {
            debug!("{from} already joined as {current}, ignoring join as {username}");
            return;
        }
        Err(e) => {
            info!("Rejecting join from {from} as {username:?}: {e}");
            ctx.broadcaster.send_to(from, &ServerMessage::Error { message: e.to_string() });
            ctx.broadcaster.close(from);
            return;
        }
    }

    let center = ctx.spawn_chunk();
    let generated = ctx.loader.ensure_radius(&mut ctx.world, center, ctx.chunk_radius);

    let world = ServerMessage::World {
        blocks: WorldBlocks(ctx.world.snapshot()),
    };
    ctx.broadcaster.send_to(from, &world);
    ctx.broadcaster.send_to(from, &ServerMessage::Welcome);
    ctx.broadcaster.mark_joined(from);
    ctx.broadcaster.broadcast(
        &ServerMessage::PlayerJoined {
            username: username.clone(),
        },
        Some(from),
    );

    info!(
        "{username} joined on {from} ({} online, {generated} new chunks, {} blocks)",
        ctx.sessions.len(),
        ctx.world.len()
    );
}

fn handle_input(ctx: &mut ServerContext, from: ConnectionId, msg: ClientMessage) {
    let ClientMessage::Input { input } = msg else {
        return;
    };
    if !ctx.sessions.set_input(from, player_input(&input)) {
        debug!("Ignoring input from {from} before join");
    }
}

fn handle_block_action(ctx: &mut ServerContext, from: ConnectionId, msg: ClientMessage) {
    let ClientMessage::BlockAction { action, pos } = msg else {
        return;
    };
    if !ctx.sessions.is_joined(from) {
        debug!("Ignoring block action from {from} before join");
        return;
    }

    let block = action.result_block();
    ctx.world.set(pos, block);
    debug!("{from} {action:?} at {pos}");
    ctx.broadcaster
        .broadcast(&ServerMessage::BlockUpdate(BlockUpdate::new(pos, block)), Some(from));
}

fn handle_block_update(ctx: &mut ServerContext, from: ConnectionId, msg: ClientMessage) {
    let ClientMessage::BlockUpdate(update) = msg else {
        return;
    };
    if !ctx.sessions.is_joined(from) {
        debug!("Ignoring block update from {from} before join");
        return;
    }

    ctx.world.set(update.pos(), update.block_type);
    debug!("{from} set {} to {:?}", update.pos(), update.block_type);
    ctx.broadcaster.broadcast(&ServerMessage::BlockUpdate(update), Some(from));
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_config::WorldConfig;
    use blockyard_net::{BlockAction, InputState, decode};
    use blockyard_voxel::{BlockType, VoxelPos};

    struct Harness {
        ctx: ServerContext,
        router: MessageRouter<ServerContext>,
    }

    impl Harness {
        fn new() -> Self {
            let config = WorldConfig {
                chunk_radius: 0,
                tree_chance: 0.0,
                ..WorldConfig::default()
            };
            Self {
                ctx: ServerContext::new(&config),
                router: build_router(),
            }
        }

        fn connect(&mut self, id: u64) -> mpsc::Receiver<Outbound> {
            let (tx, rx) = mpsc::channel(64);
            connection_opened(&mut self.ctx, ConnectionId(id), "127.0.0.1:9".parse().unwrap(), tx);
            rx
        }

        fn deliver(&mut self, id: u64, msg: ClientMessage) -> bool {
            message_received(&mut self.ctx, &self.router, ConnectionId(id), msg)
        }

        fn send(&mut self, id: u64, msg: ClientMessage) {
            assert!(self.deliver(id, msg));
        }

        fn join(&mut self, id: u64, name: &str) {
            self.send(id, ClientMessage::Join { username: name.into() });
        }
    }

    /// Decode everything queued, with `None` standing for a close command.
    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Option<ServerMessage>> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(match command {
                Outbound::Frame(payload) => Some(decode(&payload).unwrap()),
                Outbound::Close => None,
            });
        }
        out
    }

    #[test]
    fn test_join_sends_world_then_welcome() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        h.join(1, "alice");

        let messages = drain(&mut a);
        assert_eq!(messages.len(), 2);
        let Some(ServerMessage::World { blocks }) = &messages[0] else {
            panic!("expected world first, got {:?}", messages[0]);
        };
        // Spawn chunk (0, 0): column (0, 0) has grass at y = 20.
        assert_eq!(blocks.0.get(&VoxelPos::new(0, 20, 0)), Some(&BlockType::Grass));
        assert_eq!(messages[1], Some(ServerMessage::Welcome));
        assert!(h.ctx.loader.is_generated(h.ctx.spawn_chunk()));
    }

    #[test]
    fn test_second_join_notifies_first() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        drain(&mut a);
        h.join(2, "bob");

        assert_eq!(
            drain(&mut a),
            vec![Some(ServerMessage::PlayerJoined { username: "bob".into() })]
        );
        let to_bob = drain(&mut b);
        assert_eq!(to_bob.len(), 2);
        assert!(!to_bob.contains(&Some(ServerMessage::PlayerJoined { username: "bob".into() })));
    }

    #[test]
    fn test_duplicate_name_gets_error_and_close() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        drain(&mut a);
        h.join(2, "alice");

        assert_eq!(
            drain(&mut b),
            vec![Some(ServerMessage::Error { message: "Username taken".into() }), None]
        );
        assert!(drain(&mut a).is_empty());
        assert_eq!(h.ctx.sessions.connection_for("alice"), Some(ConnectionId(1)));
    }

    #[test]
    fn test_rejected_connection_cannot_join_again() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        drain(&mut a);

        h.join(2, "alice");
        assert!(!h.deliver(2, ClientMessage::Join { username: "mallory".into() }));
        let pos = VoxelPos::new(0, 30, 0);
        assert!(!h.deliver(2, ClientMessage::BlockAction { action: BlockAction::Place, pos }));

        assert_eq!(h.ctx.sessions.len(), 1);
        assert!(h.ctx.sessions.connection_for("mallory").is_none());
        assert_eq!(h.ctx.world.get(pos), BlockType::Air);
        assert!(drain(&mut a).is_empty());
        assert_eq!(
            drain(&mut b),
            vec![Some(ServerMessage::Error { message: "Username taken".into() }), None]
        );
    }

    #[test]
    fn test_messages_after_writer_gone_ignored() {
        let mut h = Harness::new();
        let b = h.connect(2);
        drop(b);
        assert!(!h.deliver(2, ClientMessage::Join { username: "ghost".into() }));
        assert!(h.ctx.sessions.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        h.join(1, "");
        let messages = drain(&mut a);
        assert!(matches!(messages.first(), Some(Some(ServerMessage::Error { .. }))));
        assert_eq!(messages.last(), Some(&None));
        assert!(h.ctx.sessions.is_empty());
    }

    #[test]
    fn test_rejoin_ignored() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        h.join(1, "alice");
        drain(&mut a);
        h.join(1, "alice-again");
        assert!(drain(&mut a).is_empty());
        assert_eq!(h.ctx.sessions.len(), 1);
    }

    #[test]
    fn test_break_block_relayed_to_others_only() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        h.join(2, "bob");
        drain(&mut a);
        drain(&mut b);

        let pos = VoxelPos::new(5, 10, 5);
        assert_eq!(h.ctx.world.get(pos), BlockType::Stone);
        h.send(1, ClientMessage::BlockAction { action: BlockAction::Break, pos });

        assert_eq!(h.ctx.world.get(pos), BlockType::Air);
        assert!(!h.ctx.world.snapshot().contains_key(&pos));
        assert!(drain(&mut a).is_empty());
        assert_eq!(
            drain(&mut b),
            vec![Some(ServerMessage::BlockUpdate(BlockUpdate::new(pos, BlockType::Air)))]
        );
    }

    #[test]
    fn test_place_writes_stone() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        h.join(1, "alice");
        drain(&mut a);

        let pos = VoxelPos::new(0, 30, 0);
        h.send(1, ClientMessage::BlockAction { action: BlockAction::Place, pos });
        assert_eq!(h.ctx.world.get(pos), BlockType::Stone);
    }

    #[test]
    fn test_block_update_applied_verbatim_and_relayed() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        h.join(2, "bob");
        drain(&mut a);
        drain(&mut b);

        let update = BlockUpdate::new(VoxelPos::new(3, 25, -2), BlockType::Planks);
        h.send(2, ClientMessage::BlockUpdate(update));

        assert_eq!(h.ctx.world.get(update.pos()), BlockType::Planks);
        assert_eq!(drain(&mut a), vec![Some(ServerMessage::BlockUpdate(update))]);
        assert!(drain(&mut b).is_empty());
    }

    #[test]
    fn test_unjoined_messages_ignored() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        drain(&mut a);

        let pos = VoxelPos::new(0, 50, 0);
        h.send(2, ClientMessage::BlockAction { action: BlockAction::Place, pos });
        h.send(2, ClientMessage::BlockUpdate(BlockUpdate::new(pos, BlockType::Sand)));
        h.send(2, ClientMessage::Input { input: InputState { jump: true, ..Default::default() } });

        assert_eq!(h.ctx.world.get(pos), BlockType::Air);
        assert!(drain(&mut a).is_empty());
        assert!(drain(&mut b).is_empty());
    }

    #[test]
    fn test_input_replaces_buffer() {
        let mut h = Harness::new();
        let _a = h.connect(1);
        h.join(1, "alice");

        let mut input = InputState { jump: true, ..Default::default() };
        input.keys.insert("KeyD".into(), true);
        h.send(1, ClientMessage::Input { input });
        let session = h.ctx.sessions.get(ConnectionId(1)).unwrap();
        assert!(session.input.jump);
        assert!(session.input.keys.right);

        h.send(1, ClientMessage::Input { input: InputState::default() });
        let session = h.ctx.sessions.get(ConnectionId(1)).unwrap();
        assert!(!session.input.jump);
        assert!(!session.input.keys.right);
    }

    #[test]
    fn test_disconnect_broadcasts_leave_and_frees_name() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.join(1, "alice");
        h.join(2, "bob");
        drain(&mut a);

        connection_closed(&mut h.ctx, ConnectionId(2));
        assert_eq!(
            drain(&mut a),
            vec![Some(ServerMessage::PlayerLeft { username: "bob".into() })]
        );
        assert!(h.ctx.sessions.connection_for("bob").is_none());
        assert!(!h.ctx.broadcaster.is_registered(ConnectionId(2)));
        drain(&mut b);
    }

    #[test]
    fn test_unjoined_disconnect_is_silent() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let _b = h.connect(2);
        h.join(1, "alice");
        drain(&mut a);

        connection_closed(&mut h.ctx, ConnectionId(2));
        assert!(drain(&mut a).is_empty());
        assert_eq!(h.ctx.broadcaster.len(), 1);
    }

    #[test]
    fn test_rejoin_does_not_regenerate_chunks() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        h.join(1, "alice");
        drain(&mut a);

        let grass = VoxelPos::new(0, 20, 0);
        h.send(1, ClientMessage::BlockAction { action: BlockAction::Break, pos: grass });
        connection_closed(&mut h.ctx, ConnectionId(1));

        let mut c = h.connect(3);
        h.join(3, "alice");
        drain(&mut c);
        assert_eq!(h.ctx.world.get(grass), BlockType::Air);
    }
}
