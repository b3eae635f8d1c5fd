//! Tree decoration shape: a wooden trunk topped by a diamond leaf canopy.

use blockyard_voxel::{BlockType, VoxelPos};

use crate::generator::{BlockWrite, WriteMode};

/// Shortest trunk, in blocks above the surface.
pub const MIN_TRUNK_HEIGHT: i32 = 4;

/// Tallest trunk, in blocks above the surface.
pub const MAX_TRUNK_HEIGHT: i32 = 6;

/// Trees only grow on columns whose surface is above this height.
pub const MIN_SURFACE_HEIGHT: i32 = 5;

/// Horizontal reach of the canopy from the trunk axis.
const CANOPY_RADIUS: i32 = 2;

/// Number of leaf layers above the trunk top (inclusive of the top itself).
const CANOPY_LAYERS: i32 = 2;

/// Manhattan budget shared between horizontal offset and layer height.
const CANOPY_SPREAD: i32 = 3;

/// Writes for one tree rooted on the surface block `surface`.
///
/// The trunk occupies the `trunk_height` blocks directly above the surface
/// and overwrites whatever is there. Leaves fill the diamond around the
/// trunk top but only into empty voxels, so they never replace the trunk or
/// terrain.
pub fn tree_writes(surface: VoxelPos, trunk_height: i32) -> Vec<BlockWrite> {
    let mut writes = Vec::new();

    for dy in 1..=trunk_height {
        writes.push(BlockWrite {
            pos: surface.offset(0, dy, 0),
            block: BlockType::Wood,
            mode: WriteMode::Overwrite,
        });
    }

    let crown = surface.offset(0, trunk_height, 0);
    for lx in -CANOPY_RADIUS..=CANOPY_RADIUS {
        for lz in -CANOPY_RADIUS..=CANOPY_RADIUS {
            for ly in 0..=CANOPY_LAYERS {
                if lx.abs() + lz.abs() + ly <= CANOPY_SPREAD {
                    writes.push(BlockWrite {
                        pos: crown.offset(lx, ly, lz),
                        block: BlockType::Leaves,
                        mode: WriteMode::IfEmpty,
                    });
                }
            }
        }
    }

    writes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_sits_above_surface() {
        let surface = VoxelPos::new(4, 20, -3);
        let writes = tree_writes(surface, 5);
        let trunk: Vec<_> = writes
            .iter()
            .filter(|w| w.block == BlockType::Wood)
            .map(|w| w.pos)
            .collect();
        assert_eq!(
            trunk,
            (21..=25).map(|y| VoxelPos::new(4, y, -3)).collect::<Vec<_>>()
        );
        assert!(
            writes
                .iter()
                .filter(|w| w.block == BlockType::Wood)
                .all(|w| w.mode == WriteMode::Overwrite)
        );
    }

    #[test]
    fn test_canopy_is_diamond() {
        let surface = VoxelPos::new(0, 10, 0);
        let leaves: Vec<_> = tree_writes(surface, 4)
            .into_iter()
            .filter(|w| w.block == BlockType::Leaves)
            .collect();

        assert!(leaves.iter().all(|w| w.mode == WriteMode::IfEmpty));
        for leaf in &leaves {
            let lx = leaf.pos.x;
            let lz = leaf.pos.z;
            let ly = leaf.pos.y - 14;
            assert!((0..=2).contains(&ly));
            assert!(lx.abs() + lz.abs() + ly <= 3, "leaf outside diamond: {:?}", leaf.pos);
        }
        // Layer 0: |lx|+|lz| <= 3 within the 5x5 square -> 21 cells.
        assert_eq!(leaves.iter().filter(|w| w.pos.y == 14).count(), 21);
        // Layer 2 is a plus shape.
        assert_eq!(leaves.iter().filter(|w| w.pos.y == 16).count(), 5);
    }
}
