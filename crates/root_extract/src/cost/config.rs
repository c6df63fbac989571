//! Parameters for the radius, comparative and cost fields.

use crate::error::{ExtractError, Result};

/// Parameters for [`compute_radius_field`](super::compute_radius_field).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadiusParams {
  /// Normalized intensity at or above which a voxel counts as occupied.
  pub min_occupancy: f32,
  /// Fraction of a sphere that must be occupied for its radius to count.
  pub min_sphere_occupancy: f32,
  /// Largest sphere radius tested, in voxels.
  pub max_sphere_radius: usize,
}

impl RadiusParams {
  pub const DEFAULT: Self = Self {
    min_occupancy: 0.5,
    min_sphere_occupancy: 0.75,
    max_sphere_radius: 15,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_min_occupancy(mut self, value: f32) -> Self {
    self.min_occupancy = value;
    self
  }

  pub fn with_min_sphere_occupancy(mut self, value: f32) -> Self {
    self.min_sphere_occupancy = value;
    self
  }

  pub fn with_max_sphere_radius(mut self, value: usize) -> Self {
    self.max_sphere_radius = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.min_occupancy > 0.0 && self.min_occupancy <= 1.0) {
      return Err(ExtractError::config("min_occupancy", "must lie in (0, 1]"));
    }
    if !(self.min_sphere_occupancy > 0.0 && self.min_sphere_occupancy <= 1.0) {
      return Err(ExtractError::config(
        "min_sphere_occupancy",
        "must lie in (0, 1]",
      ));
    }
    if self.max_sphere_radius == 0 {
      return Err(ExtractError::config("max_sphere_radius", "must be at least 1"));
    }
    Ok(())
  }
}

impl Default for RadiusParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Parameters for [`compute_cost_field`](super::compute_cost_field).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostParams {
  /// Weight of the normalized radius relative to normalized intensity.
  pub radius_weight: f32,
  /// Added to the inverted field so no voxel is free.
  pub cost_offset: f32,
  /// Fraction of the top of the cost range treated as gap territory.
  /// `0` disables the gap penalty.
  pub gap_fraction: f32,
}

impl CostParams {
  pub const DEFAULT: Self = Self {
    radius_weight: 1.0,
    cost_offset: 0.00001,
    gap_fraction: 0.0,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_radius_weight(mut self, value: f32) -> Self {
    self.radius_weight = value;
    self
  }

  pub fn with_cost_offset(mut self, value: f32) -> Self {
    self.cost_offset = value;
    self
  }

  pub fn with_gap_fraction(mut self, value: f32) -> Self {
    self.gap_fraction = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.radius_weight >= 0.0 && self.radius_weight.is_finite()) {
      return Err(ExtractError::config("radius_weight", "must be finite and >= 0"));
    }
    if !(self.cost_offset >= 0.0 && self.cost_offset.is_finite()) {
      return Err(ExtractError::config("cost_offset", "must be finite and >= 0"));
    }
    if !(0.0..1.0).contains(&self.gap_fraction) {
      return Err(ExtractError::config("gap_fraction", "must lie in [0, 1)"));
    }
    Ok(())
  }
}

impl Default for CostParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Default half-width of the comparative window.
pub const DEFAULT_COMPARATIVE_MASK: usize = 2;
