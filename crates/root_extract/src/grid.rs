//! Dense voxel grids shared by every field in the extraction core.
//!
//! # Memory Layout
//!
//! ```text
//! Row-major, Z innermost:
//!
//! Address:  0        1        ...  Z-1        Z        ...
//! Content: [0,0,0]  [0,0,1]  ...  [0,0,Z-1]  [0,1,0]  ...
//!          └───────── Z ─────────┘└────── Z ──────
//!
//! index = (x * Y + y) * Z + z
//! ```
//!
//! # Anisotropy
//!
//! Each grid carries `dim_facs`, the physical edge length of a voxel along
//! each axis relative to the others. Distances that must be physical (sphere
//! masks, path step lengths, branch lengths) scale offsets by it.

use std::ops::{Index, IndexMut};

use glam::Vec3;

use crate::error::{ExtractError, Result};

/// Integer voxel coordinate `(x, y, z)`.
pub type Coord = [usize; 3];

/// Flatten a coordinate into a linear index for the given dims.
#[inline(always)]
pub const fn coord_to_index(dims: [usize; 3], c: Coord) -> usize {
  (c[0] * dims[1] + c[1]) * dims[2] + c[2]
}

/// Inverse of [`coord_to_index`].
#[inline(always)]
pub const fn index_to_coord(dims: [usize; 3], index: usize) -> Coord {
  let z = index % dims[2];
  let rest = index / dims[2];
  [rest / dims[1], rest % dims[1], z]
}

/// Dense 3D array with per-axis voxel scale.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid<T> {
  dims: [usize; 3],
  dim_facs: Vec3,
  data: Vec<T>,
}

impl<T: Copy> VoxelGrid<T> {
  /// Grid of `dims` with every voxel set to `value` and isotropic scale.
  pub fn filled(dims: [usize; 3], value: T) -> Self {
    Self {
      dims,
      dim_facs: Vec3::ONE,
      data: vec![value; dims[0] * dims[1] * dims[2]],
    }
  }

  /// Same shape and scale as `other`, filled with `value`.
  pub fn filled_like<U>(other: &VoxelGrid<U>, value: T) -> Self {
    Self {
      dims: other.dims,
      dim_facs: other.dim_facs,
      data: vec![value; other.data.len()],
    }
  }

  /// Wrap an existing buffer laid out as described in the module docs.
  pub fn from_vec(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
    let expected = dims[0] * dims[1] * dims[2];
    if data.len() != expected {
      return Err(ExtractError::SizeMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      dims,
      dim_facs: Vec3::ONE,
      data,
    })
  }

  /// Build a grid by evaluating `f` at every coordinate.
  pub fn from_fn(dims: [usize; 3], mut f: impl FnMut(Coord) -> T) -> Self {
    let len = dims[0] * dims[1] * dims[2];
    let data = (0..len).map(|i| f(index_to_coord(dims, i))).collect();
    Self {
      dims,
      dim_facs: Vec3::ONE,
      data,
    }
  }

  /// Set the anisotropic voxel scale.
  pub fn with_dim_facs(mut self, dim_facs: Vec3) -> Self {
    self.dim_facs = dim_facs;
    self
  }

  #[inline]
  pub fn get(&self, c: Coord) -> Option<T> {
    self.contains(c).then(|| self.data[self.index_of(c)])
  }

  #[inline]
  pub fn set(&mut self, c: Coord, value: T) {
    let i = self.index_of(c);
    self.data[i] = value;
  }

  /// Apply `f` to every voxel, keeping shape and scale.
  pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> VoxelGrid<U> {
    VoxelGrid {
      dims: self.dims,
      dim_facs: self.dim_facs,
      data: self.data.iter().map(|&v| f(v)).collect(),
    }
  }
}

impl<T> VoxelGrid<T> {
  #[inline]
  pub fn dims(&self) -> [usize; 3] {
    self.dims
  }

  #[inline]
  pub fn dim_facs(&self) -> Vec3 {
    self.dim_facs
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  #[inline]
  pub fn as_mut_slice(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn into_vec(self) -> Vec<T> {
    self.data
  }

  /// Approximate heap footprint in bytes.
  pub fn byte_size(&self) -> usize {
    self.data.capacity() * std::mem::size_of::<T>()
  }

  #[inline(always)]
  pub fn index_of(&self, c: Coord) -> usize {
    coord_to_index(self.dims, c)
  }

  #[inline(always)]
  pub fn coord_of(&self, index: usize) -> Coord {
    index_to_coord(self.dims, index)
  }

  #[inline]
  pub fn contains(&self, c: Coord) -> bool {
    c[0] < self.dims[0] && c[1] < self.dims[1] && c[2] < self.dims[2]
  }

  /// Convert a signed coordinate, returning `None` outside the grid.
  #[inline]
  pub fn checked_coord(&self, c: [i64; 3]) -> Option<Coord> {
    let inside = (0..3).all(|a| c[a] >= 0 && (c[a] as u64) < self.dims[a] as u64);
    inside.then(|| [c[0] as usize, c[1] as usize, c[2] as usize])
  }

  /// Validate a source coordinate against the grid.
  pub fn require_coord(&self, c: [i64; 3]) -> Result<Coord> {
    self
      .checked_coord(c)
      .ok_or(ExtractError::SourceOutOfBounds {
        coord: c,
        dims: self.dims,
      })
  }

  /// Neighbor of `c` at `offset`, or `None` when it leaves the grid.
  #[inline(always)]
  pub fn offset(&self, c: Coord, offset: [i32; 3]) -> Option<Coord> {
    let x = c[0] as i64 + offset[0] as i64;
    let y = c[1] as i64 + offset[1] as i64;
    let z = c[2] as i64 + offset[2] as i64;
    self.checked_coord([x, y, z])
  }

  /// Error unless `other` has the same dims.
  pub fn require_same_shape<U>(&self, other: &VoxelGrid<U>) -> Result<()> {
    if self.dims != other.dims {
      return Err(ExtractError::SizeMismatch {
        expected: self.len(),
        actual: other.len(),
      });
    }
    Ok(())
  }

  /// Physical length of an integer offset under this grid's scale.
  #[inline]
  pub fn scaled_length(&self, offset: [i32; 3]) -> f32 {
    (Vec3::new(offset[0] as f32, offset[1] as f32, offset[2] as f32) * self.dim_facs).length()
  }
}

impl VoxelGrid<f32> {
  /// Largest sample, or `0.0` for an empty grid.
  pub fn max_value(&self) -> f32 {
    self.data.iter().copied().fold(0.0_f32, f32::max)
  }

  pub fn min_value(&self) -> f32 {
    if self.data.is_empty() {
      return 0.0;
    }
    self.data.iter().copied().fold(f32::INFINITY, f32::min)
  }

  /// Copy scaled so the maximum is `1.0`; all zeros when the max is not
  /// positive.
  pub fn normalized(&self) -> Self {
    let max = self.max_value();
    if max <= 0.0 {
      return Self::filled_like(self, 0.0);
    }
    let inv = 1.0 / max;
    self.map(|v| v * inv)
  }
}

impl<T> Index<Coord> for VoxelGrid<T> {
  type Output = T;

  #[inline(always)]
  fn index(&self, c: Coord) -> &T {
    &self.data[coord_to_index(self.dims, c)]
  }
}

impl<T> IndexMut<Coord> for VoxelGrid<T> {
  #[inline(always)]
  fn index_mut(&mut self, c: Coord) -> &mut T {
    &mut self.data[coord_to_index(self.dims, c)]
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
