//! Result of a path search: per-voxel best and second-best arrivals.

use glam::Vec3;

use super::neighborhood::{Connectivity, PredCode};
use crate::grid::{Coord, VoxelGrid};

/// Accumulated cost and the direction it arrived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRecord {
  pub cost: f32,
  pub pred: PredCode,
}

impl PathRecord {
  #[inline]
  pub const fn unreached(cutoff: f32) -> Self {
    Self {
      cost: cutoff,
      pred: PredCode::INVALID,
    }
  }

  pub const SOURCE: Self = Self {
    cost: 0.0,
    pred: PredCode::SOURCE,
  };
}

/// Shortest-path forest rooted at a single source.
///
/// Unreached voxels hold `cost == cutoff` and [`PredCode::INVALID`]. The
/// secondary record of a voxel, when present, arrived from a different
/// neighbor than the primary one.
#[derive(Clone, Debug)]
pub struct PathTree {
  primary: VoxelGrid<PathRecord>,
  secondary: VoxelGrid<PathRecord>,
  source: Coord,
  cutoff: f32,
  connectivity: Connectivity,
}

impl PathTree {
  pub(crate) fn new(
    primary: VoxelGrid<PathRecord>,
    secondary: VoxelGrid<PathRecord>,
    source: Coord,
    cutoff: f32,
    connectivity: Connectivity,
  ) -> Self {
    Self {
      primary,
      secondary,
      source,
      cutoff,
      connectivity,
    }
  }

  #[inline]
  pub fn dims(&self) -> [usize; 3] {
    self.primary.dims()
  }

  #[inline]
  pub fn dim_facs(&self) -> Vec3 {
    self.primary.dim_facs()
  }

  #[inline]
  pub fn source(&self) -> Coord {
    self.source
  }

  #[inline]
  pub fn cutoff(&self) -> f32 {
    self.cutoff
  }

  #[inline]
  pub fn connectivity(&self) -> Connectivity {
    self.connectivity
  }

  #[inline]
  pub fn primary(&self, c: Coord) -> PathRecord {
    self.primary[c]
  }

  #[inline]
  pub fn secondary(&self, c: Coord) -> PathRecord {
    self.secondary[c]
  }

  #[inline]
  pub fn cost(&self, c: Coord) -> f32 {
    self.primary[c].cost
  }

  #[inline]
  pub fn pred(&self, c: Coord) -> PredCode {
    self.primary[c].pred
  }

  #[inline]
  pub fn is_reached(&self, c: Coord) -> bool {
    self.primary[c].pred.is_reached()
  }

  pub fn contains(&self, c: Coord) -> bool {
    self.primary.contains(c)
  }

  /// Coordinate of the primary predecessor, `None` at the source and for
  /// unreached voxels.
  #[inline]
  pub fn predecessor(&self, c: Coord) -> Option<Coord> {
    let offset = self.primary[c].pred.offset()?;
    self.primary.offset(c, offset)
  }

  /// Primary chain from `c` back to the source, both ends included.
  ///
  /// Empty when `c` was never reached.
  pub fn chain(&self, c: Coord) -> Vec<Coord> {
    if !self.contains(c) || !self.is_reached(c) {
      return Vec::new();
    }
    let mut chain = vec![c];
    let mut cur = c;
    // A valid forest never revisits a voxel; the bound only stops corrupt input.
    while let Some(next) = self.predecessor(cur) {
      if chain.len() > self.primary.len() {
        break;
      }
      chain.push(next);
      cur = next;
    }
    chain
  }

  pub fn reached_count(&self) -> usize {
    self
      .primary
      .as_slice()
      .iter()
      .filter(|r| r.pred.is_reached())
      .count()
  }

  /// Primary costs as a plain field.
  pub fn primary_costs(&self) -> VoxelGrid<f32> {
    self.primary.map(|r| r.cost)
  }

  /// Approximate heap footprint in bytes.
  pub fn byte_size(&self) -> usize {
    self.primary.byte_size() + self.secondary.byte_size()
  }
}
