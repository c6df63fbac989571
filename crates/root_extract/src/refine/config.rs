//! Refinement parameters.

use crate::error::{ExtractError, Result};
use crate::path::Connectivity;

/// Post-processing applied to a freshly built skeleton.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefineParams {
  /// Run the pred, radius and tip repairs first.
  pub repair: bool,
  /// Leaf runs shorter than this (scaled) are pruned. `0` disables.
  pub min_branch_length: f32,
  /// Leaf runs thinner than this on average are pruned. `0` disables.
  pub min_branch_radius: f32,
  /// Replace the graph by its Douglas-Peucker simplification.
  pub interpolate: bool,
  pub interpolation_max_diff: f32,
  /// Reroute expensive edges after the repairs. `None` disables.
  pub rebuild: Option<RebuildParams>,
}

impl RefineParams {
  pub const DEFAULT: Self = Self {
    repair: true,
    min_branch_length: 0.0,
    min_branch_radius: 0.0,
    interpolate: false,
    interpolation_max_diff: 2.25,
    rebuild: None,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_repair(mut self, value: bool) -> Self {
    self.repair = value;
    self
  }

  pub fn with_min_branch_length(mut self, value: f32) -> Self {
    self.min_branch_length = value;
    self
  }

  pub fn with_min_branch_radius(mut self, value: f32) -> Self {
    self.min_branch_radius = value;
    self
  }

  /// Enable interpolation with the given maximum deviation.
  pub fn with_interpolation(mut self, max_diff: f32) -> Self {
    self.interpolate = true;
    self.interpolation_max_diff = max_diff;
    self
  }

  pub fn with_rebuild(mut self, value: Option<RebuildParams>) -> Self {
    self.rebuild = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.min_branch_length >= 0.0 && self.min_branch_length.is_finite()) {
      return Err(ExtractError::config("min_branch_length", "must be finite and >= 0"));
    }
    if !(self.min_branch_radius >= 0.0 && self.min_branch_radius.is_finite()) {
      return Err(ExtractError::config("min_branch_radius", "must be finite and >= 0"));
    }
    if self.interpolate && !(self.interpolation_max_diff >= 0.0) {
      return Err(ExtractError::config("interpolation_max_diff", "must be >= 0"));
    }
    if let Some(rebuild) = &self.rebuild {
      rebuild.validate()?;
    }
    Ok(())
  }
}

impl Default for RefineParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Parameters for [`rebuild_graph`](super::rebuild_graph).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebuildParams {
  /// An edge is rerouted when its straight-line cost exceeds the local
  /// optimum times this ratio.
  pub max_cost_ratio: f32,
  /// Voxels added around each edge's bounding box for the local search.
  pub margin: usize,
  pub connectivity: Connectivity,
}

impl RebuildParams {
  pub const DEFAULT: Self = Self {
    max_cost_ratio: 1.5,
    margin: 3,
    connectivity: Connectivity::TwentySix,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_max_cost_ratio(mut self, value: f32) -> Self {
    self.max_cost_ratio = value;
    self
  }

  pub fn with_margin(mut self, value: usize) -> Self {
    self.margin = value;
    self
  }

  pub fn with_connectivity(mut self, value: Connectivity) -> Self {
    self.connectivity = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.max_cost_ratio >= 1.0) {
      return Err(ExtractError::config("max_cost_ratio", "must be >= 1"));
    }
    Ok(())
  }
}

impl Default for RebuildParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}
