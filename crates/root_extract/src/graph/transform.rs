//! Rigid transforms applied to every node position.

use glam::{DAffine3, DMat3, DVec3, EulerRot, Vec3};

use super::RootGraph;

impl RootGraph {
  /// Apply an affine transform in double precision.
  pub fn apply_transform(&mut self, transform: &DAffine3) {
    for node in self.nodes_mut() {
      node.position = transform.transform_point3(node.position.as_dvec3()).as_vec3();
    }
  }

  pub fn translate(&mut self, offset: Vec3) {
    self.apply_transform(&DAffine3::from_translation(offset.as_dvec3()));
  }

  /// Rotate around the origin by Euler angles in degrees.
  ///
  /// `angles = (a, b, c)` builds `Rz(a) * Ry(b) * Rx(c)`.
  pub fn rotate(&mut self, angles_deg: Vec3) {
    self.apply_transform(&DAffine3::from_mat3(euler_zyx(angles_deg)));
  }

  /// Rotate around `pivot` instead of the origin.
  pub fn rotate_around(&mut self, pivot: Vec3, angles_deg: Vec3) {
    let pivot = pivot.as_dvec3();
    let transform = DAffine3::from_translation(pivot)
      * DAffine3::from_mat3(euler_zyx(angles_deg))
      * DAffine3::from_translation(-pivot);
    self.apply_transform(&transform);
  }

  /// Move the graph so the root sits at the origin.
  pub fn zero_root(&mut self) {
    let offset = -self[self.root()].position;
    self.translate(offset);
  }
}

fn euler_zyx(angles_deg: Vec3) -> DMat3 {
  let a = DVec3::new(
    angles_deg.x as f64,
    angles_deg.y as f64,
    angles_deg.z as f64,
  ) * (std::f64::consts::PI / 180.0);
  DMat3::from_euler(EulerRot::ZYX, a.x, a.y, a.z)
}
