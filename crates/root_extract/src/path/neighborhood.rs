//! Voxel neighborhoods and predecessor encoding.
//!
//! # Canonical Offsets
//!
//! The 26 neighbor offsets are ordered lexicographically over `(dx, dy, dz)`
//! in `-1..=1`, skipping the origin:
//!
//! ```text
//! index:   0          1          2         ...  12         13        ...  25
//! offset: (-1,-1,-1) (-1,-1, 0) (-1,-1, 1) ... ( 0, 0,-1) ( 0, 0, 1) ... (1,1,1)
//! ```
//!
//! The list is point-symmetric, so the opposite of offset `k` is `25 - k`.
//! Ties between equal-cost predecessors always resolve to the lower index.

use crate::error::{ExtractError, Result};

/// All 26 neighbor offsets in canonical order.
pub const CANONICAL_OFFSETS: [[i32; 3]; 26] = build_offsets();

const fn build_offsets() -> [[i32; 3]; 26] {
  let mut out = [[0i32; 3]; 26];
  let mut k = 0;
  let mut dx = -1;
  while dx <= 1 {
    let mut dy = -1;
    while dy <= 1 {
      let mut dz = -1;
      while dz <= 1 {
        if !(dx == 0 && dy == 0 && dz == 0) {
          out[k] = [dx, dy, dz];
          k += 1;
        }
        dz += 1;
      }
      dy += 1;
    }
    dx += 1;
  }
  out
}

/// Face neighbors.
const SIX: [u8; 6] = [4, 10, 12, 13, 15, 21];

/// Face and edge neighbors.
const EIGHTEEN: [u8; 18] = [1, 3, 4, 5, 7, 9, 10, 11, 12, 13, 14, 15, 16, 18, 20, 21, 22, 24];

const TWENTY_SIX: [u8; 26] = [
  0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
];

/// Which neighbors a voxel can step to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Connectivity {
  Six,
  Eighteen,
  #[default]
  TwentySix,
}

impl Connectivity {
  /// Parse a neighborhood code.
  ///
  /// Accepts the neighbor count (6, 18, 26) and the legacy degree codes
  /// (1 = faces, 2 = +edges, 3 = +corners).
  pub fn from_code(code: u32) -> Result<Self> {
    match code {
      6 | 1 => Ok(Self::Six),
      18 | 2 => Ok(Self::Eighteen),
      26 | 3 => Ok(Self::TwentySix),
      other => Err(ExtractError::InvalidNeighborhood(other)),
    }
  }

  /// Number of neighbors.
  pub const fn degree(self) -> u32 {
    match self {
      Self::Six => 6,
      Self::Eighteen => 18,
      Self::TwentySix => 26,
    }
  }

  /// Canonical offset indices of this neighborhood, ascending.
  pub fn codes(self) -> &'static [u8] {
    match self {
      Self::Six => &SIX,
      Self::Eighteen => &EIGHTEEN,
      Self::TwentySix => &TWENTY_SIX,
    }
  }
}

/// Direction from a voxel to its predecessor, as a canonical offset index.
///
/// Two reserved values mark the search source and unreached voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredCode(u8);

impl PredCode {
  /// Voxel was never reached.
  pub const INVALID: Self = Self(u8::MAX);
  /// Voxel is the search source.
  pub const SOURCE: Self = Self(254);

  /// Code for canonical offset `index` (`0..26`).
  #[inline]
  pub const fn from_index(index: u8) -> Option<Self> {
    if index < 26 {
      Some(Self(index))
    } else {
      None
    }
  }

  /// Code for a raw offset, `None` for the origin or non-unit steps.
  pub fn from_offset(offset: [i32; 3]) -> Option<Self> {
    CANONICAL_OFFSETS
      .iter()
      .position(|&o| o == offset)
      .map(|k| Self(k as u8))
  }

  #[inline]
  pub const fn raw(self) -> u8 {
    self.0
  }

  /// True for codes that point to a neighbor.
  #[inline]
  pub const fn is_step(self) -> bool {
    self.0 < 26
  }

  #[inline]
  pub const fn is_reached(self) -> bool {
    self.0 != Self::INVALID.0
  }

  /// Offset from the voxel to its predecessor.
  #[inline]
  pub const fn offset(self) -> Option<[i32; 3]> {
    if self.is_step() {
      Some(CANONICAL_OFFSETS[self.0 as usize])
    } else {
      None
    }
  }

  /// Code pointing the other way.
  #[inline]
  pub const fn opposite(self) -> Self {
    if self.is_step() {
      Self(25 - self.0)
    } else {
      self
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_offsets_are_lexicographic() {
    assert_eq!(CANONICAL_OFFSETS[0], [-1, -1, -1]);
    assert_eq!(CANONICAL_OFFSETS[12], [0, 0, -1]);
    assert_eq!(CANONICAL_OFFSETS[13], [0, 0, 1]);
    assert_eq!(CANONICAL_OFFSETS[25], [1, 1, 1]);
    for pair in CANONICAL_OFFSETS.windows(2) {
      assert!(pair[0] < pair[1]);
    }
  }

  #[test]
  fn test_opposites_are_point_symmetric() {
    for k in 0..26u8 {
      let code = PredCode::from_index(k).unwrap();
      let a = code.offset().unwrap();
      let b = code.opposite().offset().unwrap();
      assert_eq!([a[0] + b[0], a[1] + b[1], a[2] + b[2]], [0, 0, 0]);
    }
  }

  #[test]
  fn test_neighborhood_classes() {
    for &k in Connectivity::Six.codes() {
      let o = CANONICAL_OFFSETS[k as usize];
      assert_eq!(o.iter().filter(|&&v| v != 0).count(), 1);
    }
    for &k in Connectivity::Eighteen.codes() {
      let o = CANONICAL_OFFSETS[k as usize];
      assert!(o.iter().filter(|&&v| v != 0).count() <= 2);
    }
    assert_eq!(Connectivity::TwentySix.codes().len(), 26);
  }

  #[test]
  fn test_from_code() {
    assert_eq!(Connectivity::from_code(6).unwrap(), Connectivity::Six);
    assert_eq!(Connectivity::from_code(2).unwrap(), Connectivity::Eighteen);
    assert_eq!(Connectivity::from_code(26).unwrap(), Connectivity::TwentySix);
    assert!(matches!(
      Connectivity::from_code(8),
      Err(ExtractError::InvalidNeighborhood(8))
    ));
  }

  #[test]
  fn test_reserved_codes() {
    assert!(!PredCode::INVALID.is_reached());
    assert!(PredCode::SOURCE.is_reached());
    assert!(!PredCode::SOURCE.is_step());
    assert_eq!(PredCode::SOURCE.offset(), None);
    assert_eq!(PredCode::from_offset([0, 0, 0]), None);
    assert_eq!(PredCode::from_offset([1, 0, 0]).map(PredCode::raw), Some(21));
  }
}
