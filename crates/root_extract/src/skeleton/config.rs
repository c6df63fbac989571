//! Skeleton extraction parameters.

use super::cut::CutPlane;
use crate::error::{ExtractError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonParams {
  /// Comparative value at or above which a voxel is a quench point.
  pub min_cmb: f32,
  /// Coverage ball radius as a multiple of the node radius.
  pub dilation: f32,
  pub cut_plane: Option<CutPlane>,
  /// Quench points must lie farther than this (scaled) from the source.
  pub qp_min_dist: f32,
  /// Trace from the old graph's leaves instead of comparative maxima.
  pub seed_from_old_leaves: bool,
}

impl SkeletonParams {
  pub const DEFAULT: Self = Self {
    min_cmb: 1.0,
    dilation: 3.0,
    cut_plane: None,
    qp_min_dist: 0.0,
    seed_from_old_leaves: false,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_min_cmb(mut self, value: f32) -> Self {
    self.min_cmb = value;
    self
  }

  pub fn with_dilation(mut self, value: f32) -> Self {
    self.dilation = value;
    self
  }

  /// Dilation from the legacy percentage sum (`200` means `3.0`).
  pub fn with_dilation_percent(self, dil_sum: u32) -> Self {
    self.with_dilation(1.0 + (dil_sum / 100) as f32)
  }

  pub fn with_cut_plane(mut self, plane: Option<CutPlane>) -> Self {
    self.cut_plane = plane;
    self
  }

  pub fn with_qp_min_dist(mut self, value: f32) -> Self {
    self.qp_min_dist = value;
    self
  }

  pub fn with_seed_from_old_leaves(mut self, value: bool) -> Self {
    self.seed_from_old_leaves = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !self.min_cmb.is_finite() {
      return Err(ExtractError::config("min_cmb", "must be finite"));
    }
    if !(self.dilation > 0.0 && self.dilation.is_finite()) {
      return Err(ExtractError::config("dilation", "must be finite and positive"));
    }
    if !(self.qp_min_dist >= 0.0 && self.qp_min_dist.is_finite()) {
      return Err(ExtractError::config("qp_min_dist", "must be finite and >= 0"));
    }
    Ok(())
  }
}

impl Default for SkeletonParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}
