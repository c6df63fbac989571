//! Graph vertices and their generational ids.

use glam::Vec3;
use smallvec::SmallVec;

/// Generational index into a [`RootGraph`](super::RootGraph) arena.
///
/// A removed node's slot may be reused; ids taken before the removal then
/// stop resolving instead of aliasing the new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
  pub(crate) index: u32,
  pub(crate) generation: u32,
}

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.index as usize
  }

  #[inline]
  pub fn generation(self) -> u32 {
    self.generation
  }
}

/// One sample of a root: a position in voxel coordinates plus thickness.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
  pub position: Vec3,
  /// Radius in voxels, `>= 0`.
  pub radius: f32,
  pub branch_id: u32,
  pub(crate) parent: Option<NodeId>,
  /// Most nodes have one child, branch points two.
  pub(crate) children: SmallVec<[NodeId; 2]>,
}

impl Node {
  /// Unlinked node.
  pub fn new(position: Vec3, radius: f32, branch_id: u32) -> Self {
    Self {
      position,
      radius,
      branch_id,
      parent: None,
      children: SmallVec::new(),
    }
  }

  #[inline]
  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  #[inline]
  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  #[inline]
  pub fn rank(&self) -> usize {
    self.children.len()
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  /// Copy of the payload without links.
  pub fn detached(&self) -> Self {
    Self::new(self.position, self.radius, self.branch_id)
  }
}
