//! Filled rasterization of a graph into a volume.
//!
//! Every edge becomes a capsule whose radius runs linearly from
//! `radius_rate * r(parent)` to `radius_rate * r(child)`:
//!
//! ```text
//!        r0                      r1
//!     .-----.________________.-----.
//!    (   a   )              (   b   )
//!     '-----'‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾'-----'
//! ```
//!
//! Distances are measured in scaled space (`dim_facs`).

use glam::Vec3;
use rayon::prelude::*;

use crate::graph::{Node, RootGraph};
use crate::grid::VoxelGrid;

/// Radii below this (in scaled units) are raised to it.
const MIN_CAPSULE_RADIUS: f32 = 0.5;

/// Copy of `volume` with `value` written into every voxel covered by the
/// graph's capsules. A graph without edges marks a ball around the root.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::mask_volume"))]
pub fn mask_volume_by_graph<T>(
  volume: &VoxelGrid<T>,
  graph: &RootGraph,
  dim_facs: Vec3,
  value: T,
  radius_rate: f32,
) -> VoxelGrid<T>
where
  T: Copy + Send + Sync,
{
  let mut segments: Vec<Capsule> = graph
    .edges()
    .into_iter()
    .map(|(p, c)| Capsule::new(&graph[p], &graph[c], radius_rate))
    .collect();
  if segments.is_empty() {
    let root = &graph[graph.root()];
    segments.push(Capsule::new(root, root, radius_rate));
  }

  let dims = volume.dims();
  let hits: Vec<Vec<usize>> = segments
    .par_iter()
    .map(|capsule| capsule.voxels(dims, dim_facs))
    .collect();

  let mut out = volume.clone();
  let slice = out.as_mut_slice();
  for index in hits.into_iter().flatten() {
    slice[index] = value;
  }
  out
}

#[derive(Clone, Copy, Debug)]
struct Capsule {
  a: Vec3,
  b: Vec3,
  ra: f32,
  rb: f32,
}

impl Capsule {
  fn new(from: &Node, to: &Node, rate: f32) -> Self {
    Self {
      a: from.position,
      b: to.position,
      ra: (from.radius * rate).max(MIN_CAPSULE_RADIUS),
      rb: (to.radius * rate).max(MIN_CAPSULE_RADIUS),
    }
  }

  /// Flat indices of all voxels inside the capsule.
  fn voxels(&self, dims: [usize; 3], facs: Vec3) -> Vec<usize> {
    let r = self.ra.max(self.rb);
    let reach = Vec3::splat(r) / facs.max(Vec3::splat(f32::EPSILON));
    let lo = (self.a.min(self.b) - reach).floor().max(Vec3::ZERO);
    let hi = (self.a.max(self.b) + reach).ceil();
    let bound = |v: f32, d: usize| (v.max(0.0) as usize).min(d.saturating_sub(1));
    let (a, b) = (self.a * facs, self.b * facs);
    let ab = b - a;
    let len_sq = ab.length_squared();

    let mut out = Vec::new();
    if hi.x < 0.0 || hi.y < 0.0 || hi.z < 0.0 {
      return out;
    }
    for x in bound(lo.x, dims[0])..=bound(hi.x, dims[0]) {
      for y in bound(lo.y, dims[1])..=bound(hi.y, dims[1]) {
        for z in bound(lo.z, dims[2])..=bound(hi.z, dims[2]) {
          let p = Vec3::new(x as f32, y as f32, z as f32) * facs;
          let t = if len_sq > 0.0 {
            ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
          } else {
            0.0
          };
          let radius = self.ra + (self.rb - self.ra) * t;
          if p.distance_squared(a + ab * t) <= radius * radius {
            out.push((x * dims[1] + y) * dims[2] + z);
          }
        }
      }
    }
    out
  }
}
