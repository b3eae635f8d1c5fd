//! Player movement physics over the voxel world.
//!
//! Collision is a coarse corner-sampled AABB test against solid voxels
//! ([`collision`]); movement is a fixed-step kinematic integrator with
//! axis-separated resolution ([`kinematics`]).

pub mod collision;
pub mod kinematics;

pub use collision::{BoxSize, PLAYER_BOX, is_obstructed};
pub use kinematics::{
    GRAVITY, JUMP_FORCE, MOUSE_SENSITIVITY, MoveKeys, PLAYER_SPEED, PlayerBody, PlayerInput, step,
};
