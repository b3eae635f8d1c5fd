//! Lazy population of the world around players.
//!
//! The loader remembers which chunks it has generated so each chunk is
//! populated at most once. Player edits inside a generated chunk therefore
//! survive later visits.

use blockyard_voxel::{ChunkKey, VoxelWorld};
use rustc_hash::FxHashSet;

use crate::generator::{ChunkGenerator, apply_writes};

/// Generates chunks on demand and tracks which ones exist.
#[derive(Debug, Default)]
pub struct ChunkLoader {
    generator: ChunkGenerator,
    /// Keys of every chunk already written into the world.
    generated: FxHashSet<ChunkKey>,
}

impl ChunkLoader {
    /// Creates a loader that uses `generator` for new chunks.
    pub fn new(generator: ChunkGenerator) -> Self {
        Self {
            generator,
            generated: FxHashSet::default(),
        }
    }

    /// Generate every not-yet-generated chunk in the square of `radius`
    /// chunks around `center`. Returns how many chunks were generated.
    pub fn ensure_radius(&mut self, world: &mut VoxelWorld, center: ChunkKey, radius: i32) -> usize {
        let mut count = 0;
        for key in center.square(radius) {
            if self.ensure_chunk(world, key) {
                count += 1;
            }
        }
        if count > 0 {
            tracing::debug!(
                "Generated {} chunk(s) around ({}, {}), world now holds {} blocks",
                count,
                center.x,
                center.z,
                world.len()
            );
        }
        count
    }

    /// Generate `key` if it has not been generated yet. Returns `true` if
    /// the chunk was generated by this call.
    pub fn ensure_chunk(&mut self, world: &mut VoxelWorld, key: ChunkKey) -> bool {
        if !self.generated.insert(key) {
            return false;
        }
        let writes = self.generator.generate(key);
        let applied = apply_writes(world, &writes);
        tracing::trace!("Chunk ({}, {}): {} writes, {} applied", key.x, key.z, writes.len(), applied);
        true
    }

    /// Whether `key` has been generated.
    pub fn is_generated(&self, key: ChunkKey) -> bool {
        self.generated.contains(&key)
    }

    /// Number of generated chunks.
    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }
}
