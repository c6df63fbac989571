//! Sampling the graph's centerline into points and voxels.

use glam::Vec3;

use super::RootGraph;
use crate::error::{ExtractError, Result};
use crate::grid::VoxelGrid;

impl RootGraph {
  /// Points along every edge at most `spacing` apart.
  ///
  /// The first list holds only the root. Every following list belongs to one
  /// edge in preorder of its child: samples at `spacing, 2*spacing, ...` from
  /// the parent, then the child itself.
  pub fn dense_points(&self, spacing: f32) -> Result<Vec<Vec<Vec3>>> {
    require_spacing(spacing)?;
    let mut out = vec![vec![self[self.root()].position]];
    for (p, c) in self.edges() {
      let (from, to) = (self[p].position, self[c].position);
      let len = from.distance(to);
      let dir = (to - from).normalize_or_zero();
      let mut samples = Vec::with_capacity((len / spacing) as usize + 1);
      let mut t = spacing;
      while t < len {
        samples.push(from + dir * t);
        t += spacing;
      }
      samples.push(to);
      out.push(samples);
    }
    Ok(out)
  }

  /// Mark the centerline in a `u8` volume of `dims`.
  ///
  /// Samples that round to a voxel outside `dims` are skipped.
  pub fn rasterize(&self, dims: [usize; 3], spacing: f32) -> Result<VoxelGrid<u8>> {
    let mut grid = VoxelGrid::filled(dims, 0u8);
    for point in self.dense_points(spacing)?.into_iter().flatten() {
      let r = point.round();
      if let Some(c) = grid.checked_coord([r.x as i64, r.y as i64, r.z as i64]) {
        grid[c] = 1;
      }
    }
    Ok(grid)
  }
}

fn require_spacing(spacing: f32) -> Result<()> {
  if !(spacing > 0.0 && spacing.is_finite()) {
    return Err(ExtractError::config("spacing", "must be finite and positive"));
  }
  Ok(())
}
