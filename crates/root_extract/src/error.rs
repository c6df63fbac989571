//! Error taxonomy for the extraction core.
//!
//! Only input, configuration and serialization problems surface as errors.
//! Unreachable voxels are sentinel values in the path tree, and structural
//! inconsistencies in a graph are repaired in place by the refiner.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
  // ---------------------------------------------------------------------------
  // Input
  // ---------------------------------------------------------------------------
  /// Volume has no voxels or no positive sample.
  #[error("degenerate volume: {reason}")]
  DegenerateVolume { reason: &'static str },

  /// Start coordinate lies outside the grid.
  #[error("source coordinate {coord:?} is outside grid of dims {dims:?}")]
  SourceOutOfBounds { coord: [i64; 3], dims: [usize; 3] },

  /// Buffer length does not match the declared dimensions, or two fields that
  /// must share a grid do not.
  #[error("size mismatch: expected {expected}, got {actual}")]
  SizeMismatch { expected: usize, actual: usize },

  // ---------------------------------------------------------------------------
  // Configuration
  // ---------------------------------------------------------------------------
  /// A parameter is outside its valid range.
  #[error("invalid parameter `{param}`: {reason}")]
  InvalidConfig { param: &'static str, reason: String },

  /// Neighborhood code is not one of 6/18/26 (or 1/2/3).
  #[error("invalid neighborhood code {0}, expected 6, 18 or 26")]
  InvalidNeighborhood(u32),

  /// Extension from old leaves was requested without an old graph.
  #[error("seeding from old leaves requires an old graph")]
  MissingOldGraph,

  /// The source lies in the region removed by the cut plane.
  #[error("source coordinate {coord:?} lies beyond the cut plane")]
  SourceInCutRegion { coord: [usize; 3] },

  // ---------------------------------------------------------------------------
  // Serialization
  // ---------------------------------------------------------------------------
  #[error("malformed graph document: {reason}")]
  Serialization { reason: String },

  #[error(transparent)]
  Xml(#[from] quick_xml::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  // ---------------------------------------------------------------------------
  // Handles
  // ---------------------------------------------------------------------------
  /// Handle refers to a released or replaced slot.
  #[error("stale or foreign handle")]
  StaleHandle,
}

impl ExtractError {
  pub(crate) fn config(param: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidConfig {
      param,
      reason: reason.into(),
    }
  }

  pub(crate) fn malformed(reason: impl Into<String>) -> Self {
    Self::Serialization {
      reason: reason.into(),
    }
  }

  /// Input errors: degenerate volume, bad coordinates, mismatched buffers.
  pub fn is_input_error(&self) -> bool {
    matches!(
      self,
      Self::DegenerateVolume { .. } | Self::SourceOutOfBounds { .. } | Self::SizeMismatch { .. }
    )
  }

  /// Configuration errors: bad parameters or missing collaborators.
  pub fn is_config_error(&self) -> bool {
    matches!(
      self,
      Self::InvalidConfig { .. }
        | Self::InvalidNeighborhood(_)
        | Self::MissingOldGraph
        | Self::SourceInCutRegion { .. }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_carry_context() {
    let err = ExtractError::SourceOutOfBounds {
      coord: [5, -1, 2],
      dims: [4, 4, 4],
    };
    let msg = err.to_string();
    assert!(msg.contains("[5, -1, 2]"));
    assert!(msg.contains("[4, 4, 4]"));
    assert!(err.is_input_error());
    assert!(!err.is_config_error());
  }

  #[test]
  fn config_helper_names_parameter() {
    let err = ExtractError::config("cost_cutoff", "must be positive");
    assert_eq!(
      err.to_string(),
      "invalid parameter `cost_cutoff`: must be positive"
    );
    assert!(err.is_config_error());
  }

  #[test]
  fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: ExtractError = io.into();
    assert!(matches!(err, ExtractError::Io(_)));
  }
}
