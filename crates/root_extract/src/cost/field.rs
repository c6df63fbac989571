//! Scalar traversal cost from intensity and radius.

use rayon::prelude::*;

use super::config::CostParams;
use super::{CostField, RadiusField};
use crate::error::Result;
use crate::grid::VoxelGrid;
use crate::threading::WorkerPool;

/// Multiplier applied to voxels in the gap band of the cost range.
pub const GAP_COST_SCALE: f32 = 10.0;

/// Combine intensity and radius into a traversal cost.
///
/// ```text
/// cost = invert(normalize(norm(I) + w * norm(R))) + offset
/// cost = cost / max(cost)
/// cost = cost * GAP_COST_SCALE     where cost >= 1 - gap_fraction
/// ```
///
/// Well-supported, thick voxels end up near `offset`, and background voxels
/// near `1`. Zero maxima resolve to neutral values. An all-zero input gives
/// a uniform cost of `1`. Voxels are processed in parallel on `pool`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "cost::cost_field"))]
pub fn compute_cost_field(
  intensity: &VoxelGrid<f32>,
  radius: &RadiusField,
  params: &CostParams,
  pool: &WorkerPool,
) -> Result<CostField> {
  params.validate()?;
  intensity.require_same_shape(radius)?;

  let norm_i = intensity.normalized();
  let norm_r = radius.normalized();
  let band = (params.gap_fraction > 0.0).then(|| gap_threshold(params.gap_fraction));

  let data: Vec<f32> = pool.install(|| {
    let mut data: Vec<f32> = norm_i
      .as_slice()
      .par_iter()
      .zip(norm_r.as_slice())
      .map(|(&i, &r)| i + params.radius_weight * r)
      .collect();

    let combined_max = data.par_iter().copied().reduce(|| 0.0, f32::max);
    let inv = if combined_max > 0.0 { 1.0 / combined_max } else { 0.0 };
    data
      .par_iter_mut()
      .for_each(|v| *v = 1.0 - *v * inv + params.cost_offset);

    let cost_max = data.par_iter().copied().reduce(|| 0.0, f32::max);
    let inv = if cost_max > 0.0 { 1.0 / cost_max } else { 1.0 };
    data.par_iter_mut().for_each(|v| {
      *v *= inv;
      if band.is_some_and(|band| *v >= band) {
        *v *= GAP_COST_SCALE;
      }
    });
    data
  });

  let mut cost = VoxelGrid::filled_like(intensity, 0.0_f32);
  cost.as_mut_slice().copy_from_slice(&data);
  Ok(cost)
}

/// Lower bound of the gap band in a normalized cost field.
#[inline]
pub fn gap_threshold(gap_fraction: f32) -> f32 {
  1.0 - gap_fraction
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
