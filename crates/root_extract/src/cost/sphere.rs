//! Anisotropic integer spheres, stored as concentric shells.
//!
//! ```text
//! ball(r) = { o : |o * dim_facs|² <= r² }
//! shell(r) = ball(r) \ ball(r - 1)        shell(0) = { origin }
//! ```
//!
//! Growing a sphere from `r - 1` to `r` only needs `shell(r)`, which keeps
//! the radius search at one visit per mask voxel instead of re-summing the
//! whole ball for every radius.

use glam::Vec3;

#[derive(Clone, Debug)]
pub struct SphereShells {
  shells: Vec<Vec<[i32; 3]>>,
  dim_facs: Vec3,
}

impl SphereShells {
  /// Build shells `0..=max_radius`. `dim_facs` components must be positive.
  pub fn new(max_radius: usize, dim_facs: Vec3) -> Self {
    let mut shells = vec![Vec::new(); max_radius + 1];
    let extent = |f: f32| (max_radius as f32 / f.max(f32::EPSILON)).ceil() as i32;
    let (ex, ey, ez) = (extent(dim_facs.x), extent(dim_facs.y), extent(dim_facs.z));
    let max_sq = (max_radius * max_radius) as f64;

    for dx in -ex..=ex {
      for dy in -ey..=ey {
        for dz in -ez..=ez {
          let sq = scaled_sq([dx, dy, dz], dim_facs);
          if sq > max_sq {
            continue;
          }
          shells[shell_of(sq)].push([dx, dy, dz]);
        }
      }
    }
    Self { shells, dim_facs }
  }

  #[inline]
  pub fn max_radius(&self) -> usize {
    self.shells.len() - 1
  }

  #[inline]
  pub fn dim_facs(&self) -> Vec3 {
    self.dim_facs
  }

  /// Offsets whose scaled distance lies in `(r - 1, r]`.
  #[inline]
  pub fn shell(&self, r: usize) -> &[[i32; 3]] {
    self.shells.get(r).map(Vec::as_slice).unwrap_or(&[])
  }

  /// All offsets of the ball of radius `r` (clamped to the built maximum).
  pub fn ball(&self, r: usize) -> impl Iterator<Item = [i32; 3]> + '_ {
    let r = r.min(self.max_radius());
    self.shells[..=r].iter().flatten().copied()
  }

  /// Voxel count of the ball of radius `r`.
  pub fn ball_len(&self, r: usize) -> usize {
    let r = r.min(self.max_radius());
    self.shells[..=r].iter().map(Vec::len).sum()
  }
}

#[inline]
fn scaled_sq(o: [i32; 3], f: Vec3) -> f64 {
  let x = o[0] as f64 * f.x as f64;
  let y = o[1] as f64 * f.y as f64;
  let z = o[2] as f64 * f.z as f64;
  x * x + y * y + z * z
}

/// Smallest integer `r` with `sq <= r²`.
fn shell_of(sq: f64) -> usize {
  let mut r = sq.sqrt().ceil() as usize;
  while r > 0 && ((r - 1) * (r - 1)) as f64 >= sq {
    r -= 1;
  }
  while ((r * r) as f64) < sq {
    r += 1;
  }
  r
}
