//! Test fixtures for pipeline tests.
//!
//! Synthetic intensity volumes built from line segments, so tests can reason
//! about the expected topology without shipping scan data.

use std::sync::Arc;

use glam::Vec3;

use crate::grid::VoxelGrid;

/// Tube half-width of the synthetic roots, in voxels.
pub const TUBE_RADIUS: f32 = 1.6;

/// Source voxel of [`y_volume`].
pub const Y_SOURCE: [i64; 3] = [8, 4, 0];

/// Distance from `p` to the segment `a`-`b`.
pub fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
  let ab = b - a;
  let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
  (p - (a + ab * t)).length()
}

/// Volume of `dims` with intensity 1 within [`TUBE_RADIUS`] of any segment.
pub fn tube_volume(dims: [usize; 3], segments: &[(Vec3, Vec3)]) -> VoxelGrid<f32> {
  VoxelGrid::from_fn(dims, |c| {
    let p = Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32);
    let inside = segments
      .iter()
      .any(|&(a, b)| segment_distance(p, a, b) <= TUBE_RADIUS);
    if inside {
      1.0
    } else {
      0.0
    }
  })
}

/// Trunk up z from [`Y_SOURCE`] forking into two arms.
///
/// ```text
///   (3,4,18)     (13,4,18)
///        \         /
///         \       /
///          (8,4,10)
///             |
///          (8,4,0)
/// ```
pub fn y_volume() -> Arc<VoxelGrid<f32>> {
  let fork = Vec3::new(8.0, 4.0, 10.0);
  Arc::new(tube_volume(
    [17, 9, 20],
    &[
      (Vec3::new(8.0, 4.0, 0.0), fork),
      (fork, Vec3::new(3.0, 4.0, 18.0)),
      (fork, Vec3::new(13.0, 4.0, 18.0)),
    ],
  ))
}

/// Single straight tube up z, small enough for async tests.
pub fn rod_volume() -> Arc<VoxelGrid<f32>> {
  Arc::new(tube_volume(
    [9, 9, 12],
    &[(Vec3::new(4.0, 4.0, 0.0), Vec3::new(4.0, 4.0, 11.0))],
  ))
}
