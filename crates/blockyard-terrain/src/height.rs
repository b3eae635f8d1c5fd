//! The terrain surface height-field.

/// Base surface height the sine field oscillates around.
const BASE_HEIGHT: i32 = 20;

/// Peak deviation from [`BASE_HEIGHT`], in blocks.
const AMPLITUDE: f64 = 10.0;

/// Horizontal frequency of the sine field.
const FREQUENCY: f64 = 0.1;

/// Y of the topmost (grass) block in world column `(x, z)`.
///
/// A pure function of world coordinates, so neighbouring chunks tile without
/// seams. Uses `libm` rather than platform libc for bit-identical results on
/// every target.
pub fn surface_height(world_x: i32, world_z: i32) -> i32 {
    let wave = libm::sin(world_x as f64 * FREQUENCY) * libm::cos(world_z as f64 * FREQUENCY);
    libm::floor(wave * AMPLITUDE) as i32 + BASE_HEIGHT
}
