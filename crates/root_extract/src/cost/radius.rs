//! Per-voxel thickness estimate by sphere growing.

use rayon::prelude::*;

use super::config::RadiusParams;
use super::sphere::SphereShells;
use super::RadiusField;
use crate::error::Result;
use crate::grid::VoxelGrid;
use crate::threading::WorkerPool;

/// Estimate a local radius for every voxel.
///
/// The volume is normalized by its maximum first. A voxel below
/// `min_occupancy` gets 0. Otherwise the sphere around it grows one shell at a
/// time while the occupied fraction stays at or above `min_sphere_occupancy`.
/// The result is the last radius that passed, so it always lies in
/// `[0, max_sphere_radius]`. Voxels outside the grid count as empty.
///
/// A volume whose maximum is not positive yields an all-zero field.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "cost::radius_field"))]
pub fn compute_radius_field(
  volume: &VoxelGrid<f32>,
  params: &RadiusParams,
  pool: &WorkerPool,
) -> Result<RadiusField> {
  params.validate()?;

  let max = volume.max_value();
  if max <= 0.0 {
    return Ok(VoxelGrid::filled_like(volume, 0.0));
  }

  let threshold = params.min_occupancy * max;
  let occupied: Vec<bool> = volume.as_slice().iter().map(|&v| v >= threshold).collect();
  let shells = SphereShells::new(params.max_sphere_radius, volume.dim_facs());

  let data: Vec<f32> = pool.install(|| {
    (0..volume.len())
      .into_par_iter()
      .map(|i| {
        if !occupied[i] {
          return 0.0;
        }
        grow_sphere(volume, &occupied, &shells, i, params.min_sphere_occupancy) as f32
      })
      .collect()
  });

  let mut field = VoxelGrid::filled_like(volume, 0.0_f32);
  field.as_mut_slice().copy_from_slice(&data);
  Ok(field)
}

fn grow_sphere(
  volume: &VoxelGrid<f32>,
  occupied: &[bool],
  shells: &SphereShells,
  index: usize,
  min_sphere_occupancy: f32,
) -> usize {
  let center = volume.coord_of(index);
  // The center itself is occupied.
  let mut hits = 1usize;
  let mut total = 1usize;
  let mut radius = 0;

  for r in 1..=shells.max_radius() {
    for &offset in shells.shell(r) {
      total += 1;
      if let Some(n) = volume.offset(center, offset) {
        if occupied[volume.index_of(n)] {
          hits += 1;
        }
      }
    }
    if (hits as f32) < min_sphere_occupancy * total as f32 {
      break;
    }
    radius = r;
  }
  radius
}

#[cfg(test)]
#[path = "radius_test.rs"]
mod radius_test;
