//! Integer voxel coordinates and chunk keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width and depth of a chunk column, in voxels.
pub const CHUNK_SIZE: i32 = 16;

/// Height of generated terrain columns. Blocks may still be placed above it.
pub const WORLD_HEIGHT: i32 = 64;

/// Position of a single voxel. Used directly as the world store key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel containing the continuous point `(x, y, z)`.
    ///
    /// Each component is floored, so `-0.5` lands in voxel `-1`.
    pub fn containing(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
            z: z.floor() as i32,
        }
    }

    /// The chunk column this voxel belongs to.
    pub fn chunk(self) -> ChunkKey {
        ChunkKey::containing(self.x, self.z)
    }

    /// Offset this position by a delta.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Failure parsing an `"x,y,z"` coordinate key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid coordinate key '{0}'")]
pub struct CoordParseError(pub String);

impl FromStr for VoxelPos {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordParseError(s.to_string());
        let mut parts = s.split(',').map(|p| p.parse::<i32>());
        let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self::new(x, y, z))
    }
}

/// Horizontal chunk address. A chunk spans every Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing world column `(x, z)`.
    pub fn containing(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_SIZE),
            z: world_z.div_euclid(CHUNK_SIZE),
        }
    }

    /// World X/Z of this chunk's minimum corner.
    pub fn origin(self) -> (i32, i32) {
        (self.x * CHUNK_SIZE, self.z * CHUNK_SIZE)
    }

    /// Every chunk in the `(2r+1)²` square centred on this one, row by row.
    pub fn square(self, radius: i32) -> impl Iterator<Item = ChunkKey> {
        let radius = radius.max(0);
        (-radius..=radius).flat_map(move |dx| {
            (-radius..=radius).map(move |dz| ChunkKey::new(self.x + dx, self.z + dz))
        })
    }
}
