//! Fixed-step player kinematics.
//!
//! One call to [`step`] advances a [`PlayerBody`] by `dt` seconds from its
//! buffered [`PlayerInput`]:
//!
//! 1. mouse look (yaw and clamped pitch)
//! 2. horizontal walk velocity from the movement keys, rotated by yaw
//! 3. jump impulse when grounded
//! 4. gravity
//! 5. axis-separated integration in X, Z, Y order against the voxel world
//! 6. world floor clamp at y = 0

use std::f32::consts::FRAC_PI_2;

use blockyard_voxel::VoxelWorld;
use glam::{Vec2, Vec3};

use crate::collision::{BoxSize, PLAYER_BOX, is_obstructed};

/// Walk speed in blocks per second.
pub const PLAYER_SPEED: f32 = 5.0;
/// Upward velocity set by a jump.
pub const JUMP_FORCE: f32 = 10.0;
/// Vertical acceleration in blocks per second squared.
pub const GRAVITY: f32 = -30.0;
/// Radians of rotation per unit of mouse movement.
pub const MOUSE_SENSITIVITY: f32 = 0.002;

/// Key codes that drive movement.
pub const KEY_FORWARD: &str = "KeyW";
pub const KEY_BACKWARD: &str = "KeyS";
pub const KEY_LEFT: &str = "KeyA";
pub const KEY_RIGHT: &str = "KeyD";

/// Which movement keys are held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Build from `(key code, pressed)` pairs. Unrecognised codes are ignored.
    pub fn from_key_states<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut keys = Self::default();
        for (code, pressed) in states {
            match code {
                KEY_FORWARD => keys.forward = pressed,
                KEY_BACKWARD => keys.backward = pressed,
                KEY_LEFT => keys.left = pressed,
                KEY_RIGHT => keys.right = pressed,
                _ => {}
            }
        }
        keys
    }

    /// Unrotated movement direction, not normalised. Forward is -Z.
    pub fn direction(&self) -> Vec3 {
        let mut dir = Vec3::ZERO;
        if self.forward {
            dir.z -= 1.0;
        }
        if self.backward {
            dir.z += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir
    }
}

/// The most recent input a client sent. It persists until replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerInput {
    pub keys: MoveKeys,
    pub mouse: Vec2,
    pub jump: bool,
}

/// Kinematic state of one player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerBody {
    /// Base of the bounding box (feet), centred in X and Z.
    pub position: Vec3,
    pub velocity: Vec3,
    /// Rotation about Y, radians.
    pub yaw: f32,
    /// Rotation about X, radians, within `[-PI/2, PI/2]`.
    pub pitch: f32,
    pub on_ground: bool,
    pub size: BoxSize,
}

impl PlayerBody {
    /// A body at rest at `position`, airborne, facing -Z.
    pub fn spawn(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            size: PLAYER_BOX,
        }
    }

    /// Turn by a mouse delta.
    pub fn apply_look(&mut self, mouse: Vec2) {
        self.yaw -= mouse.x * MOUSE_SENSITIVITY;
        self.pitch -= mouse.y * MOUSE_SENSITIVITY;
        self.pitch = self.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Replace horizontal velocity with the walk velocity for `keys`.
    pub fn apply_walk(&mut self, keys: MoveKeys, dt: f32) {
        let mut dir = keys.direction();
        if dir != Vec3::ZERO {
            dir = dir.normalize();
        }
        let local = dir * PLAYER_SPEED * dt;
        let (sin, cos) = self.yaw.sin_cos();
        let dx = local.x * cos - local.z * sin;
        let dz = local.x * sin + local.z * cos;
        self.velocity.x = dx / dt;
        self.velocity.z = dz / dt;
    }

    /// Launch upward if grounded. Returns whether the jump happened.
    pub fn try_jump(&mut self, jump: bool) -> bool {
        if jump && self.on_ground {
            self.velocity.y = JUMP_FORCE;
            self.on_ground = false;
            true
        } else {
            false
        }
    }

    /// Move through `world` by the current velocity, one axis at a time.
    pub fn integrate(&mut self, world: &VoxelWorld, dt: f32) {
        let candidate = Vec3::new(self.position.x + self.velocity.x * dt, self.position.y, self.position.z);
        if is_obstructed(world, candidate, self.size) {
            self.velocity.x = 0.0;
        } else {
            self.position = candidate;
        }

        let candidate = Vec3::new(self.position.x, self.position.y, self.position.z + self.velocity.z * dt);
        if is_obstructed(world, candidate, self.size) {
            self.velocity.z = 0.0;
        } else {
            self.position = candidate;
        }

        let candidate = Vec3::new(self.position.x, self.position.y + self.velocity.y * dt, self.position.z);
        if is_obstructed(world, candidate, self.size) {
            self.velocity.y = 0.0;
            self.on_ground = true;
        } else {
            self.position = candidate;
            self.on_ground = false;
        }

        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.velocity.y = 0.0;
            self.on_ground = true;
        }
    }
}

/// Advance `body` by one tick of `dt` seconds.
pub fn step(body: &mut PlayerBody, input: &PlayerInput, world: &VoxelWorld, dt: f32) {
    body.apply_look(input.mouse);
    body.apply_walk(input.keys, dt);
    if body.try_jump(input.jump) {
        tracing::trace!("Jump from {:?}", body.position);
    }
    body.velocity.y += GRAVITY * dt;
    body.integrate(world, dt);
}
