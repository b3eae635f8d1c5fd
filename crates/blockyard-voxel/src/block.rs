//! Block types stored in the world.
//!
//! On the wire a block type is its numeric discriminant, so `BlockType`
//! serializes through `u8`. Air is ID 0 and is never stored explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every kind of block a voxel can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum BlockType {
    /// Empty space. Represented by absence in the world store.
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Wood = 4,
    Leaves = 5,
    Cobblestone = 6,
    Planks = 7,
    Sand = 8,
    /// Stored like any other block but never collides.
    Water = 9,
}

/// A wire value that does not name any [`BlockType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown block type id {0}")]
pub struct UnknownBlockType(pub u8);

impl BlockType {
    /// All block types in discriminant order.
    pub const ALL: [BlockType; 10] = [
        BlockType::Air,
        BlockType::Grass,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Cobblestone,
        BlockType::Planks,
        BlockType::Sand,
        BlockType::Water,
    ];

    /// Numeric ID used on the wire.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Returns `true` for [`BlockType::Air`].
    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    /// Whether an actor's bounding box is blocked by this block.
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockType::Air | BlockType::Water)
    }
}

impl From<BlockType> for u8 {
    fn from(block: BlockType) -> Self {
        block.id()
    }
}

impl TryFrom<u8> for BlockType {
    type Error = UnknownBlockType;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        BlockType::ALL
            .get(id as usize)
            .copied()
            .ok_or(UnknownBlockType(id))
    }
}
