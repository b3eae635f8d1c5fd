//! Reproducible per-chunk randomness for seeded worlds.
//!
//! The world seed keys a ChaCha8 generator and the chunk key picks its
//! stream. Both the ChaCha keystream and `seed_from_u64` are value-stable in
//! `rand_chacha`, so a seeded world decorates identically across builds and
//! toolchains.

use blockyard_voxel::ChunkKey;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stream id for `key`: chunk X in the high half, chunk Z in the low half.
/// Distinct keys never share a stream.
pub fn chunk_stream(key: ChunkKey) -> u64 {
    (u64::from(key.x as u32) << 32) | u64::from(key.z as u32)
}

/// Decoration RNG for one chunk of the world seeded with `world_seed`.
pub fn chunk_rng(world_seed: u64, key: ChunkKey) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(world_seed);
    rng.set_stream(chunk_stream(key));
    rng
}
