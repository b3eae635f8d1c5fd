//! Chunk generation: terrain columns plus random tree decoration.
//!
//! [`ChunkGenerator`] holds no world state. It produces a list of
//! [`BlockWrite`]s for a chunk key, and [`apply_writes`] commits them to a
//! [`VoxelWorld`] honouring each write's [`WriteMode`].

use blockyard_voxel::{BlockType, CHUNK_SIZE, ChunkKey, VoxelPos, VoxelWorld, WORLD_HEIGHT};
use rand::Rng;

use crate::height::surface_height;
use crate::seed::chunk_rng;
use crate::tree::{MAX_TRUNK_HEIGHT, MIN_SURFACE_HEIGHT, MIN_TRUNK_HEIGHT, tree_writes};

/// Default per-column probability of growing a tree.
pub const DEFAULT_TREE_CHANCE: f64 = 0.01;

/// Depth of the dirt band below the grass layer.
const DIRT_DEPTH: i32 = 3;

/// How a write interacts with what is already in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace whatever is stored.
    Overwrite,
    /// Only fill air; existing blocks win.
    IfEmpty,
}

/// One block produced by the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockWrite {
    pub pos: VoxelPos,
    pub block: BlockType,
    pub mode: WriteMode,
}

/// Source of randomness for tree decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TreeRandomness {
    /// Fresh thread-local randomness on every generation.
    #[default]
    Unseeded,
    /// Per-chunk RNG derived from this world seed; regenerating a chunk
    /// reproduces the same trees.
    Seeded(u64),
}

impl From<Option<u64>> for TreeRandomness {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(TreeRandomness::Unseeded, TreeRandomness::Seeded)
    }
}

/// Produces the blocks of a chunk from its key.
#[derive(Clone, Debug)]
pub struct ChunkGenerator {
    tree_chance: f64,
    randomness: TreeRandomness,
}

impl Default for ChunkGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_CHANCE, TreeRandomness::Unseeded)
    }
}

impl ChunkGenerator {
    /// Creates a generator. `tree_chance` is clamped to `[0, 1]`.
    pub fn new(tree_chance: f64, randomness: TreeRandomness) -> Self {
        Self {
            tree_chance: tree_chance.clamp(0.0, 1.0),
            randomness,
        }
    }

    /// Generate every write for `key` using the configured randomness.
    pub fn generate(&self, key: ChunkKey) -> Vec<BlockWrite> {
        match self.randomness {
            TreeRandomness::Unseeded => self.generate_with_rng(key, &mut rand::rng()),
            TreeRandomness::Seeded(seed) => self.generate_with_rng(key, &mut chunk_rng(seed, key)),
        }
    }

    /// Generate every write for `key`, drawing decoration randomness from `rng`.
    ///
    /// Columns are visited in X-major order; each column emits its terrain
    /// then (possibly) its tree.
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, key: ChunkKey, rng: &mut R) -> Vec<BlockWrite> {
        let (origin_x, origin_z) = key.origin();
        let mut writes = Vec::new();

        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let world_x = origin_x + x;
                let world_z = origin_z + z;
                let height = surface_height(world_x, world_z);

                let top = height.min(WORLD_HEIGHT - 1);
                for y in 0..=top {
                    writes.push(BlockWrite {
                        pos: VoxelPos::new(world_x, y, world_z),
                        block: column_block(y, height),
                        mode: WriteMode::Overwrite,
                    });
                }

                if rng.random::<f64>() < self.tree_chance && height > MIN_SURFACE_HEIGHT {
                    let trunk_height = rng.random_range(MIN_TRUNK_HEIGHT..=MAX_TRUNK_HEIGHT);
                    let surface = VoxelPos::new(world_x, height, world_z);
                    writes.extend(tree_writes(surface, trunk_height));
                }
            }
        }

        writes
    }
}

/// Block type at depth `y` of a column whose surface is `height`.
fn column_block(y: i32, height: i32) -> BlockType {
    if y == height {
        BlockType::Grass
    } else if y >= height - DIRT_DEPTH {
        BlockType::Dirt
    } else {
        BlockType::Stone
    }
}

/// Commit `writes` to `world` in order. Returns the number of writes that
/// changed the world.
pub fn apply_writes(world: &mut VoxelWorld, writes: &[BlockWrite]) -> usize {
    let mut applied = 0;
    for write in writes {
        let changed = match write.mode {
            WriteMode::Overwrite => world.set(write.pos, write.block) != write.block,
            WriteMode::IfEmpty => world.set_if_empty(write.pos, write.block),
        };
        if changed {
            applied += 1;
        }
    }
    applied
}
