//! The authoritative sparse block map.
//!
//! [`VoxelWorld`] maps [`VoxelPos`] to [`BlockType`]. Air is never stored:
//! writing air removes the key, and reading an absent key yields air. The
//! store exposes no locking; the simulation task owns it outright.

use rustc_hash::FxHashMap;

use crate::block::BlockType;
use crate::coords::VoxelPos;

/// Sparse map from voxel position to non-air block type.
#[derive(Debug, Default, Clone)]
pub struct VoxelWorld {
    blocks: FxHashMap<VoxelPos, BlockType>,
}

impl VoxelWorld {
    /// Creates an empty world (air everywhere).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the block at `pos`, or air if nothing is stored there.
    pub fn get(&self, pos: VoxelPos) -> BlockType {
        self.blocks.get(&pos).copied().unwrap_or(BlockType::Air)
    }

    /// Returns the block containing the continuous point `(x, y, z)`.
    pub fn block_at(&self, x: f32, y: f32, z: f32) -> BlockType {
        self.get(VoxelPos::containing(x, y, z))
    }

    /// Stores `block` at `pos` and returns the previous block.
    ///
    /// Storing air removes the entry.
    pub fn set(&mut self, pos: VoxelPos, block: BlockType) -> BlockType {
        let previous = if block.is_air() {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, block)
        };
        previous.unwrap_or(BlockType::Air)
    }

    /// Stores `block` only if `pos` is currently air. Returns whether the
    /// write happened.
    pub fn set_if_empty(&mut self, pos: VoxelPos, block: BlockType) -> bool {
        if block.is_air() || self.blocks.contains_key(&pos) {
            return false;
        }
        self.blocks.insert(pos, block);
        true
    }

    /// Copy of every stored (non-air) block, for full-world transfer.
    pub fn snapshot(&self) -> FxHashMap<VoxelPos, BlockType> {
        self.blocks.clone()
    }

    /// Iterates over every stored (non-air) block.
    pub fn iter(&self) -> impl Iterator<Item = (VoxelPos, BlockType)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, *block))
    }

    /// Number of stored (non-air) blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the world holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
