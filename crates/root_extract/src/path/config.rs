//! Path search parameters.

use super::neighborhood::Connectivity;
use crate::error::{ExtractError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathParams {
  pub connectivity: Connectivity,
  /// Paths whose accumulated cost would exceed this are not expanded.
  pub cost_cutoff: f32,
}

impl PathParams {
  pub const DEFAULT: Self = Self {
    connectivity: Connectivity::TwentySix,
    cost_cutoff: 150.0,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
    self.connectivity = connectivity;
    self
  }

  pub fn with_cost_cutoff(mut self, cutoff: f32) -> Self {
    self.cost_cutoff = cutoff;
    self
  }

  pub fn validate(&self) -> Result<()> {
    // Rejects NaN as well.
    if !(self.cost_cutoff > 0.0) {
      return Err(ExtractError::config("cost_cutoff", "must be positive"));
    }
    Ok(())
  }
}

impl Default for PathParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Gap bridging for [`shortest_path_with_gap_closing`](super::shortest_path_with_gap_closing).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GapParams {
  /// Top fraction of the cost range treated as gap voxels.
  pub gap_fraction: f32,
  /// Longest run of consecutive gap voxels that can be bridged.
  pub gap_length: u32,
}

impl GapParams {
  pub const DEFAULT: Self = Self {
    gap_fraction: 0.5,
    gap_length: 5,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  pub fn with_gap_fraction(mut self, value: f32) -> Self {
    self.gap_fraction = value;
    self
  }

  pub fn with_gap_length(mut self, value: u32) -> Self {
    self.gap_length = value;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.gap_fraction > 0.0 && self.gap_fraction < 1.0) {
      return Err(ExtractError::config("gap_fraction", "must lie in (0, 1)"));
    }
    if self.gap_length == 0 {
      return Err(ExtractError::config("gap_length", "must be at least 1"));
    }
    Ok(())
  }
}

impl Default for GapParams {
  fn default() -> Self {
    Self::DEFAULT
  }
}
