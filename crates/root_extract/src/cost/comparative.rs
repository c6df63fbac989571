//! Relative radius score ("cmb") used to find quench points.

use rayon::prelude::*;

use super::{ComparativeField, RadiusField};
use crate::grid::VoxelGrid;
use crate::threading::WorkerPool;

/// Compare each voxel's radius with its cubic neighborhood.
///
/// The window spans `mask_size` voxels on each side. A voxel with radius 0
/// scores 0. Otherwise every neighbor with a strictly larger radius `r_n`
/// subtracts `(r_n - r_c) / r_n` from the score, averaged over the in-bounds
/// neighbors:
///
/// ```text
/// cmb = 1 - Σ_{r_n > r_c} (r_n - r_c) / r_n  /  N
/// ```
///
/// The score is exactly `1.0` iff no neighbor exceeds the center. It falls
/// toward `0.0` as more and larger neighbors dominate.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "cost::comparative_field"))]
pub fn compute_comparative_field(
  radius: &RadiusField,
  mask_size: usize,
  pool: &WorkerPool,
) -> ComparativeField {
  let m = mask_size as i64;
  let data: Vec<f32> = pool.install(|| {
    (0..radius.len())
      .into_par_iter()
      .map(|i| {
        let center = radius.as_slice()[i];
        if center <= 0.0 || mask_size == 0 {
          return if center > 0.0 { 1.0 } else { 0.0 };
        }
        let c = radius.coord_of(i);
        let mut dominance = 0.0_f32;
        let mut count = 0usize;
        for dx in -m..=m {
          for dy in -m..=m {
            for dz in -m..=m {
              if dx == 0 && dy == 0 && dz == 0 {
                continue;
              }
              let n = [c[0] as i64 + dx, c[1] as i64 + dy, c[2] as i64 + dz];
              let Some(n) = radius.checked_coord(n) else {
                continue;
              };
              count += 1;
              let rn = radius[n];
              if rn > center {
                dominance += (rn - center) / rn;
              }
            }
          }
        }
        if count == 0 {
          1.0
        } else {
          (1.0 - dominance / count as f32).clamp(0.0, 1.0)
        }
      })
      .collect()
  });

  let mut field = VoxelGrid::filled_like(radius, 0.0_f32);
  field.as_mut_slice().copy_from_slice(&data);
  field
}
