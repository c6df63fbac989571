//! Axis-aligned cut plane limiting where quench points may lie.
//!
//! ```text
//!            offset
//!   Low  :  |xxxx|............|      keeps coord >= offset
//!   High :  |............|xxxx|      keeps coord <  dim - offset
//!                         offset
//! ```

use crate::error::{ExtractError, Result};
use crate::grid::Coord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
  X,
  Y,
  Z,
}

impl Axis {
  #[inline]
  pub const fn index(self) -> usize {
    match self {
      Axis::X => 0,
      Axis::Y => 1,
      Axis::Z => 2,
    }
  }
}

/// Which end of the axis the cut removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CutSide {
  /// Removes the first `offset` slices.
  Low,
  /// Removes the last `offset` slices.
  High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CutPlane {
  pub axis: Axis,
  pub side: CutSide,
  /// Number of slices removed.
  pub offset: usize,
}

impl CutPlane {
  pub const fn new(axis: Axis, side: CutSide, offset: usize) -> Self {
    Self { axis, side, offset }
  }

  /// Decode the six-valued integer code used by older configuration files.
  ///
  /// The codes count axes from the last one, so `0` cuts the bottom of Z.
  ///
  /// | code | axis | side |
  /// |------|------|------|
  /// | 0    | Z    | Low  |
  /// | 1    | Z    | High |
  /// | 2    | Y    | Low  |
  /// | 3    | Y    | High |
  /// | 4    | X    | Low  |
  /// | 5    | X    | High |
  pub fn from_legacy_code(code: u32, offset: usize) -> Result<Self> {
    let axis = match code / 2 {
      0 => Axis::Z,
      1 => Axis::Y,
      2 => Axis::X,
      _ => {
        return Err(ExtractError::config(
          "cut_plane",
          format!("legacy code {code} is not in 0..=5"),
        ))
      }
    };
    let side = if code % 2 == 0 { CutSide::Low } else { CutSide::High };
    Ok(Self::new(axis, side, offset))
  }

  /// Kept box as `(min, max)` with `max` exclusive. May be empty.
  pub fn kept_box(&self, dims: [usize; 3]) -> (Coord, Coord) {
    let mut min = [0; 3];
    let mut max = dims;
    let a = self.axis.index();
    match self.side {
      CutSide::Low => min[a] = self.offset.min(dims[a]),
      CutSide::High => max[a] = dims[a].saturating_sub(self.offset),
    }
    (min, max)
  }

  #[inline]
  pub fn keeps(&self, c: Coord, dims: [usize; 3]) -> bool {
    let v = c[self.axis.index()];
    match self.side {
      CutSide::Low => v >= self.offset,
      CutSide::High => v < dims[self.axis.index()].saturating_sub(self.offset),
    }
  }
}

/// Kept box for an optional plane; the whole grid without one.
pub(crate) fn kept_box(plane: Option<&CutPlane>, dims: [usize; 3]) -> (Coord, Coord) {
  plane.map_or(([0; 3], dims), |p| p.kept_box(dims))
}
