//! Server wiring: the simulation context and the top-level run functions.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use blockyard_config::{Config, ConfigError, ServerConfig, WorldConfig};
use blockyard_net::{GameServer, TransportConfig, event_channel};
use blockyard_terrain::{ChunkGenerator, ChunkLoader, TreeRandomness};
use blockyard_voxel::{CHUNK_SIZE, ChunkKey, VoxelPos, VoxelWorld};
use glam::Vec3;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::session::SessionRegistry;
use crate::simulation::Simulation;

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the simulation task owns.
#[derive(Debug)]
pub struct ServerContext {
    pub world: VoxelWorld,
    pub loader: ChunkLoader,
    pub sessions: SessionRegistry,
    pub broadcaster: Broadcaster,
    /// Where new sessions appear.
    pub spawn: Vec3,
    /// Square radius of chunks generated around the spawn chunk on join.
    pub chunk_radius: i32,
}

impl ServerContext {
    pub fn new(config: &WorldConfig) -> Self {
        let generator = ChunkGenerator::new(config.tree_chance, TreeRandomness::from(config.seed));
        Self {
            world: VoxelWorld::new(),
            loader: ChunkLoader::new(generator),
            sessions: SessionRegistry::new(),
            broadcaster: Broadcaster::new(),
            spawn: Vec3::from_array(config.spawn),
            chunk_radius: config.chunk_radius.max(0),
        }
    }

    /// Chunk containing the spawn point.
    pub fn spawn_chunk(&self) -> ChunkKey {
        VoxelPos::containing(self.spawn.x, self.spawn.y, self.spawn.z).chunk()
    }
}

/// Blocks in an average generated column (surface around y = 20).
const AVG_BLOCKS_PER_COLUMN: u64 = 21;

/// JSON bytes per `"x,y,z":id,` entry in a `world` message.
const WORLD_BYTES_PER_BLOCK: u64 = 15;

/// Rough size of the `world` frame a joining player receives when
/// `chunk_radius` chunks around spawn have been generated.
pub fn estimated_world_frame_bytes(chunk_radius: i32) -> u64 {
    let side = 2 * u64::from(chunk_radius.max(0).unsigned_abs()) + 1;
    let columns = side * side * (CHUNK_SIZE as u64) * (CHUNK_SIZE as u64);
    columns * AVG_BLOCKS_PER_COLUMN * WORLD_BYTES_PER_BLOCK
}

fn warn_if_world_frame_too_large(config: &Config) {
    let estimate = estimated_world_frame_bytes(config.world.chunk_radius);
    if estimate > u64::from(config.server.max_frame_bytes) {
        warn!(
            "Chunk radius {} makes the world message about {estimate} bytes, over max_frame_bytes {}; \
             joining players will be disconnected",
            config.world.chunk_radius, config.server.max_frame_bytes
        );
    }
}

fn transport_config(config: &ServerConfig) -> TransportConfig {
    TransportConfig {
        max_connections: config.max_players,
        max_frame_bytes: config.max_frame_bytes,
        outbound_queue: config.outbound_queue,
    }
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let addr = config.server.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    serve(config, listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received");
    })
    .await
}

/// Serve on `listener` until `shutdown` completes.
///
/// Spawns the simulation task, runs the accept loop on the current task,
/// then waits for the simulation to wind down.
pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server listening on {}", listener.local_addr()?);
    info!(
        "World: chunk radius {}, tree chance {}, {}",
        config.world.chunk_radius,
        config.world.tree_chance,
        match config.world.seed {
            Some(seed) => format!("seed {seed}"),
            None => "unseeded trees".to_string(),
        }
    );

    warn_if_world_frame_too_large(&config);

    let (events_tx, events_rx) = event_channel(config.server.inbound_queue);
    let transport = Arc::new(GameServer::new(transport_config(&config.server), events_tx));

    let simulation = Simulation::new(ServerContext::new(&config.world), events_rx, &config.simulation);
    let simulation_task = tokio::spawn(simulation.run(transport.shutdown_signal()));

    let stopper = Arc::clone(&transport);
    tokio::spawn(async move {
        shutdown.await;
        stopper.shutdown();
    });

    let result = transport.run_with_listener(listener).await;
    transport.shutdown();
    if let Err(e) = simulation_task.await {
        tracing::error!("Simulation task failed: {e}");
    }
    info!("Server stopped");
    result.map_err(ServerError::from)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
