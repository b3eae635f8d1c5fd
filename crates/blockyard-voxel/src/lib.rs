//! Sparse voxel world storage: block types, integer coordinates, and the
//! authoritative block map.

pub mod block;
pub mod coords;
pub mod world;

pub use block::{BlockType, UnknownBlockType};
pub use coords::{CHUNK_SIZE, ChunkKey, CoordParseError, VoxelPos, WORLD_HEIGHT};
pub use world::VoxelWorld;
