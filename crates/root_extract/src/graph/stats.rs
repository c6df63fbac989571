//! Per-branch and per-node measurements.
//!
//! A branch is a first-child chain: it starts at the root, or at the parent
//! of a non-first child, and follows `children[0]` down to a leaf.

use std::f32::consts::PI;

use glam::Vec3;

use super::{NodeId, RootGraph};

/// Measurements of one first-child chain.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchStats {
  /// Branch id of the chain's first node after the junction.
  pub branch_id: u32,
  /// Scaled length of all segments.
  pub length: f32,
  /// Sum of truncated-cone volumes per segment.
  pub volume: f32,
  pub mean_radius: f32,
  pub min_radius: f32,
  pub max_radius: f32,
  pub node_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStats {
  pub branch_id: u32,
  pub radius: f32,
  /// Number of children.
  pub rank: usize,
}

impl RootGraph {
  /// First-child chains in preorder of their start.
  ///
  /// The main chain starts at the root. Every other chain starts with its
  /// junction node, so each edge belongs to exactly one chain.
  pub fn branch_chains(&self) -> Vec<Vec<NodeId>> {
    let mut chains = Vec::new();
    let mut starts = vec![(None, self.root())];
    while let Some((junction, start)) = starts.pop() {
      let mut chain: Vec<NodeId> = junction.into_iter().collect();
      let mut cur = Some(start);
      let mut side = Vec::new();
      while let Some(id) = cur {
        chain.push(id);
        let children = self.children(id);
        side.extend(children.iter().skip(1).map(|&c| (Some(id), c)));
        cur = children.first().copied();
      }
      // Visit side branches in the order they hang off the chain.
      starts.extend(side.into_iter().rev());
      chains.push(chain);
    }
    chains
  }

  /// Branch measurements; segment lengths are scaled by `dim_facs`.
  ///
  /// Chains without any length are skipped.
  pub fn branch_statistics(&self, dim_facs: Vec3) -> Vec<BranchStats> {
    self
      .branch_chains()
      .into_iter()
      .filter_map(|chain| {
        let mut length = 0.0;
        let mut volume = 0.0;
        for pair in chain.windows(2) {
          let (a, b) = (&self[pair[0]], &self[pair[1]]);
          let d = ((b.position - a.position) * dim_facs).length();
          length += d;
          volume += frustum_volume(a.radius, b.radius, d);
        }
        if length <= 0.0 {
          return None;
        }
        let radii: Vec<f32> = chain.iter().map(|&id| self[id].radius).collect();
        let first = chain.get(1).copied().unwrap_or(chain[0]);
        Some(BranchStats {
          branch_id: self[first].branch_id,
          length,
          volume,
          mean_radius: radii.iter().sum::<f32>() / radii.len() as f32,
          min_radius: radii.iter().copied().fold(f32::INFINITY, f32::min),
          max_radius: radii.iter().copied().fold(0.0, f32::max),
          node_count: chain.len(),
        })
      })
      .collect()
  }

  /// One record per node in preorder.
  pub fn node_statistics(&self) -> Vec<NodeStats> {
    self
      .preorder()
      .into_iter()
      .map(|id| {
        let n = &self[id];
        NodeStats {
          branch_id: n.branch_id,
          radius: n.radius,
          rank: n.rank(),
        }
      })
      .collect()
  }

  pub fn max_radius(&self) -> f32 {
    self.iter().map(|(_, n)| n.radius).fold(0.0, f32::max)
  }

  /// Sum of all edge lengths scaled by `dim_facs`.
  pub fn total_length(&self, dim_facs: Vec3) -> f32 {
    self
      .edges()
      .into_iter()
      .map(|(p, c)| ((self[c].position - self[p].position) * dim_facs).length())
      .sum()
  }

  pub fn leaf_count(&self) -> usize {
    self.iter().filter(|(_, n)| n.is_leaf()).count()
  }

  /// Nodes with more than one child.
  pub fn branching_count(&self) -> usize {
    self.iter().filter(|(_, n)| n.rank() > 1).count()
  }

  /// First node in preorder within `tolerance` of `position`.
  pub fn find_point(&self, position: Vec3, tolerance: f32) -> Option<NodeId> {
    self
      .preorder()
      .into_iter()
      .find(|&id| self[id].position.distance(position) <= tolerance)
  }
}

/// Truncated cone between two radii over distance `d`.
#[inline]
fn frustum_volume(r0: f32, r1: f32, d: f32) -> f32 {
  PI / 3.0 * (r0 * r0 + r0 * r1 + r1 * r1) * d
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::Node;

  /// Y shape: trunk along z, two side branches at z = 2.
  fn y_graph() -> RootGraph {
    let mut g = RootGraph::new(Node::new(Vec3::ZERO, 2.0, 0));
    let root = g.root();
    let a = g.add_child(root, Node::new(Vec3::new(0.0, 0.0, 1.0), 2.0, 0)).unwrap();
    let j = g.add_child(a, Node::new(Vec3::new(0.0, 0.0, 2.0), 2.0, 0)).unwrap();
    g.add_child(j, Node::new(Vec3::new(0.0, 0.0, 3.0), 1.0, 0)).unwrap();
    let s = g.add_child(j, Node::new(Vec3::new(1.0, 0.0, 2.0), 1.0, 1)).unwrap();
    g.add_child(s, Node::new(Vec3::new(2.0, 0.0, 2.0), 1.0, 1)).unwrap();
    g
  }

  #[test]
  fn test_counts() {
    let g = y_graph();
    assert_eq!(g.leaf_count(), 2);
    assert_eq!(g.branching_count(), 1);
    assert_eq!(g.max_radius(), 2.0);
    assert!((g.total_length(Vec3::ONE) - 5.0).abs() < 1e-6);
    assert!((g.total_length(Vec3::new(2.0, 1.0, 1.0)) - 7.0).abs() < 1e-6);
  }

  #[test]
  fn test_branch_chains_cover_every_edge_once() {
    let g = y_graph();
    let chains = g.branch_chains();
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0].len(), 4);
    // Side chain starts at its junction.
    assert_eq!(chains[1].len(), 3);
    let edges: usize = chains.iter().map(|c| c.len() - 1).sum();
    assert_eq!(edges, g.edge_count());
  }

  #[test]
  fn test_branch_statistics() {
    let g = y_graph();
    let stats = g.branch_statistics(Vec3::ONE);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].branch_id, 0);
    assert!((stats[0].length - 3.0).abs() < 1e-6);
    assert_eq!(stats[1].branch_id, 1);
    assert!((stats[1].length - 2.0).abs() < 1e-6);
    assert_eq!(stats[1].min_radius, 1.0);
    assert_eq!(stats[1].max_radius, 2.0);
    // Two unit cylinders of radius 1 plus one junction frustum.
    let expected = frustum_volume(2.0, 1.0, 1.0) + frustum_volume(1.0, 1.0, 1.0);
    assert!((stats[1].volume - expected).abs() < 1e-5);
  }

  #[test]
  fn test_node_statistics_in_preorder() {
    let g = y_graph();
    let stats = g.node_statistics();
    assert_eq!(stats.len(), 6);
    assert_eq!(stats[2].rank, 2);
    assert_eq!(stats[4].branch_id, 1);
  }

  #[test]
  fn test_find_point() {
    let g = y_graph();
    let hit = g.find_point(Vec3::new(1.05, 0.0, 2.0), 0.1).unwrap();
    assert_eq!(g[hit].branch_id, 1);
    assert!(g.find_point(Vec3::splat(9.0), 0.5).is_none());
  }
}
