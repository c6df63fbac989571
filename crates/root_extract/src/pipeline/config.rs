//! Configuration for a whole extraction.

use crate::cost::{CostParams, RadiusParams, DEFAULT_COMPARATIVE_MASK};
use crate::error::{ExtractError, Result};
use crate::path::{Connectivity, GapParams, PathParams, SearchVariant};
use crate::refine::RefineParams;
use crate::skeleton::SkeletonParams;

/// Every parameter an [`ExtractionSession`](super::ExtractionSession) needs.
///
/// # Example
///
/// ```ignore
/// let config = ExtractionConfig::new()
///   .with_cost_cutoff(300.0)
///   .with_dilation_percent(200)
///   .with_min_branch_length(10.0)
///   .with_threads(4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractionConfig {
  pub radius: RadiusParams,
  /// Half-width of the comparative window, in voxels.
  pub comparative_mask: usize,
  pub cost: CostParams,
  pub path: PathParams,
  /// Bridge gaps during the path search. Excludes `direction_penalty`.
  pub gap: Option<GapParams>,
  /// Penalize direction reversals during the path search.
  pub direction_penalty: Option<f32>,
  pub skeleton: SkeletonParams,
  pub refine: RefineParams,
  /// Worker threads for field computation (0 = rayon default).
  pub threads: usize,
}

impl ExtractionConfig {
  pub const DEFAULT: Self = Self {
    radius: RadiusParams::DEFAULT,
    comparative_mask: DEFAULT_COMPARATIVE_MASK,
    cost: CostParams::DEFAULT,
    path: PathParams::DEFAULT,
    gap: None,
    direction_penalty: None,
    skeleton: SkeletonParams::DEFAULT,
    refine: RefineParams::DEFAULT,
    threads: 0,
  };

  pub fn new() -> Self {
    Self::DEFAULT
  }

  // ===========================================================================
  // Section setters
  // ===========================================================================

  pub fn with_radius(mut self, radius: RadiusParams) -> Self {
    self.radius = radius;
    self
  }

  pub fn with_comparative_mask(mut self, mask: usize) -> Self {
    self.comparative_mask = mask;
    self
  }

  pub fn with_cost(mut self, cost: CostParams) -> Self {
    self.cost = cost;
    self
  }

  pub fn with_path(mut self, path: PathParams) -> Self {
    self.path = path;
    self
  }

  pub fn with_gap(mut self, gap: Option<GapParams>) -> Self {
    self.gap = gap;
    self
  }

  pub fn with_direction_penalty(mut self, penalty: Option<f32>) -> Self {
    self.direction_penalty = penalty;
    self
  }

  pub fn with_skeleton(mut self, skeleton: SkeletonParams) -> Self {
    self.skeleton = skeleton;
    self
  }

  pub fn with_refine(mut self, refine: RefineParams) -> Self {
    self.refine = refine;
    self
  }

  pub fn with_threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  // ===========================================================================
  // Shortcuts for the common knobs
  // ===========================================================================

  /// Neighborhood from a degree code (6/18/26, or 1/2/3).
  pub fn with_neighborhood(mut self, code: u32) -> Result<Self> {
    self.path.connectivity = Connectivity::from_code(code)?;
    Ok(self)
  }

  pub fn with_cost_cutoff(mut self, cutoff: f32) -> Self {
    self.path.cost_cutoff = cutoff;
    self
  }

  /// Dilation as a legacy percentage (`200` gives a factor of 3).
  pub fn with_dilation_percent(mut self, dil_sum: u32) -> Self {
    self.skeleton = self.skeleton.with_dilation_percent(dil_sum);
    self
  }

  pub fn with_qp_min_dist(mut self, dist: f32) -> Self {
    self.skeleton.qp_min_dist = dist;
    self
  }

  pub fn with_min_branch_length(mut self, len: f32) -> Self {
    self.refine.min_branch_length = len;
    self
  }

  pub fn with_min_branch_radius(mut self, radius: f32) -> Self {
    self.refine.min_branch_radius = radius;
    self
  }

  pub fn with_interpolation(mut self, max_diff: f32) -> Self {
    self.refine = self.refine.with_interpolation(max_diff);
    self
  }

  /// Search variant selected by `gap` and `direction_penalty`.
  pub fn search_variant(&self) -> SearchVariant {
    match (self.gap, self.direction_penalty) {
      (Some(gap), _) => SearchVariant::GapClosing(gap),
      (None, Some(penalty)) => SearchVariant::DirectionPenalty(penalty),
      (None, None) => SearchVariant::Plain,
    }
  }

  pub fn validate(&self) -> Result<()> {
    self.radius.validate()?;
    self.cost.validate()?;
    self.path.validate()?;
    if let Some(gap) = &self.gap {
      gap.validate()?;
    }
    if let Some(penalty) = self.direction_penalty {
      if self.gap.is_some() {
        return Err(ExtractError::config(
          "direction_penalty",
          "cannot be combined with gap closing",
        ));
      }
      if !(penalty > 0.0 && penalty.is_finite()) {
        return Err(ExtractError::config(
          "direction_penalty",
          "must be finite and positive",
        ));
      }
    }
    self.skeleton.validate()?;
    self.refine.validate()?;
    Ok(())
  }
}

impl Default for ExtractionConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}
