//! Procedural chunk generation: a smooth height-field, tree decoration, and
//! lazy once-per-chunk population of the world.

pub mod generator;
pub mod height;
pub mod loader;
pub mod seed;
pub mod tree;

pub use generator::{BlockWrite, ChunkGenerator, TreeRandomness, WriteMode, apply_writes};
pub use height::surface_height;
pub use loader::ChunkLoader;
pub use seed::{chunk_rng, chunk_stream};
