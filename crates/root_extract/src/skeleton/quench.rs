//! Quench points: the chain ends traced back into the tree.
//!
//! A quench point is a local maximum of the comparative field (or a leaf of
//! an old graph) that the path search reached through a real step. Points
//! are traced in descending score order, ties broken by voxel index.

use glam::Vec3;
use rayon::prelude::*;

use super::config::SkeletonParams;
use super::cut::kept_box;
use crate::cost::{ComparativeField, RadiusField};
use crate::graph::RootGraph;
use crate::grid::{Coord, VoxelGrid};
use crate::path::PathTree;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuenchPoint {
  pub coord: Coord,
  pub score: f64,
}

/// Comparative maxima inside the kept box, scored by squared scaled distance
/// to the source.
pub(crate) fn from_comparative(
  comparative: &ComparativeField,
  tree: &PathTree,
  source: Coord,
  params: &SkeletonParams,
) -> Vec<QuenchPoint> {
  let dims = comparative.dims();
  let (min, max) = kept_box(params.cut_plane.as_ref(), dims);
  let facs = comparative.dim_facs();
  let min_sq = (params.qp_min_dist as f64).powi(2);

  let mut points: Vec<QuenchPoint> = (min[0]..max[0])
    .into_par_iter()
    .flat_map_iter(|x| {
      let mut slice = Vec::new();
      for y in min[1]..max[1] {
        for z in min[2]..max[2] {
          let c = [x, y, z];
          if !(comparative[c] >= params.min_cmb) || !tree.pred(c).is_step() {
            continue;
          }
          let sq = scaled_sq(c, source, facs);
          if sq > min_sq {
            slice.push(QuenchPoint { coord: c, score: sq });
          }
        }
      }
      slice
    })
    .collect();
  sort_by_priority(&mut points, dims);
  points
}

/// Leaves of `old`, scored by mean path radius plus path length plus height
/// above the bottom of the grid.
pub(crate) fn from_old_leaves(
  old: &RootGraph,
  radius: &RadiusField,
  tree: &PathTree,
  coverage: &VoxelGrid<u8>,
  params: &SkeletonParams,
) -> Vec<QuenchPoint> {
  let dims = radius.dims();
  let mut points: Vec<QuenchPoint> = old
    .leaves()
    .into_iter()
    .filter_map(|id| {
      let p = old[id].position.round();
      let c = radius.checked_coord([p.x as i64, p.y as i64, p.z as i64])?;
      if params.cut_plane.is_some_and(|plane| !plane.keeps(c, dims)) || !tree.pred(c).is_step() {
        return None;
      }
      let (mean_radius, length) = path_profile(c, radius, tree, coverage);
      let height = (dims[2] - c[2]) as f64;
      Some(QuenchPoint {
        coord: c,
        score: mean_radius + length as f64 + height,
      })
    })
    .collect();
  sort_by_priority(&mut points, dims);
  points
}

/// Mean radius over voxels thicker than one voxel, and voxel count, along the
/// primary chain from `c` until it hits coverage or the source.
fn path_profile(
  c: Coord,
  radius: &RadiusField,
  tree: &PathTree,
  coverage: &VoxelGrid<u8>,
) -> (f64, usize) {
  let mut length = 0;
  let mut thick = 0;
  let mut sum = 0.0;
  let mut cur = c;
  loop {
    length += 1;
    if coverage[cur] != 0 || length > radius.len() {
      break;
    }
    let Some(next) = tree.predecessor(cur) else {
      break;
    };
    let r = radius[cur];
    if r > 1.0 {
      thick += 1;
      sum += r as f64;
    }
    cur = next;
  }
  let mean = if thick > 0 { sum / thick as f64 } else { 0.0 };
  (mean, length)
}

fn sort_by_priority(points: &mut [QuenchPoint], dims: [usize; 3]) {
  let index = |c: Coord| (c[0] * dims[1] + c[1]) * dims[2] + c[2];
  points.sort_by(|a, b| {
    b.score
      .total_cmp(&a.score)
      .then_with(|| index(a.coord).cmp(&index(b.coord)))
  });
}

#[inline]
fn scaled_sq(a: Coord, b: Coord, facs: Vec3) -> f64 {
  let d = Vec3::new(
    a[0] as f32 - b[0] as f32,
    a[1] as f32 - b[1] as f32,
    a[2] as f32 - b[2] as f32,
  ) * facs;
  d.length_squared() as f64
}
