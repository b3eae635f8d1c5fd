//! Axis-aligned box versus voxel overlap test.

use blockyard_voxel::VoxelWorld;
use glam::Vec3;

/// Extents of an actor's bounding box. The box is centred on the actor in X
/// and Z and rests on its position in Y.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxSize {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl BoxSize {
    pub const fn new(width: f32, height: f32, depth: f32) -> Self {
        Self { width, height, depth }
    }

    /// The eight sampled corners for a box based at `position`.
    pub fn corners(&self, position: Vec3) -> [Vec3; 8] {
        let hw = self.width / 2.0;
        let hd = self.depth / 2.0;
        let top = position.y + self.height;
        let mut corners = [Vec3::ZERO; 8];
        let mut i = 0;
        for x in [position.x - hw, position.x + hw] {
            for y in [position.y, top] {
                for z in [position.z - hd, position.z + hd] {
                    corners[i] = Vec3::new(x, y, z);
                    i += 1;
                }
            }
        }
        corners
    }
}

/// Player bounding box: 0.8 wide, 1.9 tall, 0.8 deep.
pub const PLAYER_BOX: BoxSize = BoxSize::new(0.8, 1.9, 0.8);

/// Whether a box of `size` based at `position` overlaps a solid voxel.
///
/// Only the eight corners are sampled, so geometry thinner than the box can
/// slip between them.
pub fn is_obstructed(world: &VoxelWorld, position: Vec3, size: BoxSize) -> bool {
    size.corners(position)
        .iter()
        .any(|c| world.block_at(c.x, c.y, c.z).is_solid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_voxel::{BlockType, VoxelPos};

    fn stone_column(world: &mut VoxelWorld, x: i32, z: i32, top: i32) {
        for y in 0..=top {
            world.set(VoxelPos::new(x, y, z), BlockType::Stone);
        }
    }

    #[test]
    fn test_empty_world_is_clear() {
        let world = VoxelWorld::new();
        assert!(!is_obstructed(&world, Vec3::new(0.5, 10.0, 0.5), PLAYER_BOX));
    }

    #[test]
    fn test_stone_column_obstructs() {
        let mut world = VoxelWorld::new();
        stone_column(&mut world, 0, 0, 20);
        // Box centred in the column, base inside the stone.
        assert!(is_obstructed(&world, Vec3::new(0.5, 15.0, 0.5), PLAYER_BOX));
        // Box standing on top of the column.
        assert!(!is_obstructed(&world, Vec3::new(0.5, 21.0, 0.5), PLAYER_BOX));
    }

    #[test]
    fn test_corner_overlap_with_neighbour_column() {
        let mut world = VoxelWorld::new();
        stone_column(&mut world, 1, 0, 20);
        // Right edge at x = 0.5 + 0.4 = 0.9 stays in column 0.
        assert!(!is_obstructed(&world, Vec3::new(0.5, 10.0, 0.5), PLAYER_BOX));
        // Right edge at 1.05 reaches column 1.
        assert!(is_obstructed(&world, Vec3::new(0.65, 10.0, 0.5), PLAYER_BOX));
    }

    #[test]
    fn test_water_and_air_do_not_obstruct() {
        let mut world = VoxelWorld::new();
        for y in 0..=20 {
            world.set(VoxelPos::new(0, y, 0), BlockType::Water);
        }
        assert!(!is_obstructed(&world, Vec3::new(0.5, 10.0, 0.5), PLAYER_BOX));
    }

    #[test]
    fn test_head_corner_samples_top() {
        let mut world = VoxelWorld::new();
        world.set(VoxelPos::new(0, 11, 0), BlockType::Leaves);
        // Base at 9.5, head at 11.4: only the top corners land in y = 11.
        assert!(is_obstructed(&world, Vec3::new(0.5, 9.5, 0.5), PLAYER_BOX));
        // Base at 9.0, head at 10.9: the leaf sits above the box.
        assert!(!is_obstructed(&world, Vec3::new(0.5, 9.0, 0.5), PLAYER_BOX));
    }

    #[test]
    fn test_thin_block_between_corners_is_missed() {
        let mut world = VoxelWorld::new();
        // Base samples y = 9, head samples y = 11; the block at 10 is skipped.
        world.set(VoxelPos::new(0, 10, 0), BlockType::Stone);
        assert!(!is_obstructed(&world, Vec3::new(0.5, 9.5, 0.5), PLAYER_BOX));
    }
}
