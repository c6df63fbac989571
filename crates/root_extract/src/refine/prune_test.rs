use proptest::prelude::*;

use super::*;
use crate::graph::Node;

fn node(x: f32, y: f32, z: f32, r: f32) -> Node {
  Node::new(Vec3::new(x, y, z), r, 0)
}

/// Straight chain of `n` segments along z.
fn chain(n: usize) -> RootGraph {
  let mut g = RootGraph::new(node(0.0, 0.0, 0.0, 1.0));
  let root = g.root();
  g.add_chain(root, (1..=n).map(|i| node(0.0, 0.0, i as f32, 1.0)))
    .unwrap();
  g
}

/// Trunk of `trunk` segments up z, then two arms along +x and -x.
fn y_graph(trunk: usize, left: usize, right: usize, arm_radius: [f32; 2]) -> RootGraph {
  let mut g = RootGraph::new(node(0.0, 0.0, 0.0, 2.0));
  let root = g.root();
  let j = g
    .add_chain(root, (1..=trunk).map(|i| node(0.0, 0.0, i as f32, 2.0)))
    .unwrap();
  let t = trunk as f32;
  g.add_chain(j, (1..=left).map(|i| node(-(i as f32), 0.0, t, arm_radius[0])))
    .unwrap();
  g.add_chain(j, (1..=right).map(|i| node(i as f32, 0.0, t, arm_radius[1])))
    .unwrap();
  g
}

// =============================================================================
// Short branches
// =============================================================================

#[test]
fn test_single_branch_shorter_than_limit_leaves_only_root() {
  let mut g = chain(50);
  let removed = prune_short_branches(&mut g, 100.0, Vec3::ONE);
  assert_eq!(removed, 50);
  assert_eq!(g.node_count(), 1);
  assert!(g.is_well_formed());
}

#[test]
fn test_short_arm_removed_long_arm_kept() {
  let mut g = y_graph(5, 2, 10, [1.0, 1.0]);
  let before = g.node_count();
  assert_eq!(prune_short_branches(&mut g, 5.0, Vec3::ONE), 2);
  assert_eq!(g.node_count(), before - 2);
  assert_eq!(g.leaf_count(), 1);
  assert_eq!(g.branching_count(), 0);
}

#[test]
fn test_pruning_cascades_through_new_leaves() {
  // Both arms go first; the bare trunk then is a short run itself.
  let mut g = y_graph(3, 2, 2, [1.0, 1.0]);
  prune_short_branches(&mut g, 4.0, Vec3::ONE);
  assert_eq!(g.node_count(), 1);
}

#[test]
fn test_length_uses_dim_mults() {
  let mut g = chain(4);
  assert_eq!(prune_short_branches(&mut g, 6.0, Vec3::new(1.0, 1.0, 2.0)), 0);
  assert_eq!(prune_short_branches(&mut g, 6.0, Vec3::ONE), 4);
}

#[test]
fn test_zero_limit_keeps_everything() {
  let mut g = y_graph(3, 1, 1, [1.0, 1.0]);
  assert_eq!(prune_short_branches(&mut g, 0.0, Vec3::ONE), 0);
  assert_eq!(prune_thin_branches(&mut g, 0.0, Vec3::ONE), 0);
}

#[test]
fn test_prune_short_is_idempotent() {
  let mut g = y_graph(5, 2, 10, [1.0, 1.0]);
  prune_short_branches(&mut g, 5.0, Vec3::ONE);
  let once = g.clone();
  assert_eq!(prune_short_branches(&mut g, 5.0, Vec3::ONE), 0);
  assert_eq!(g, once);
}

// =============================================================================
// Thin branches
// =============================================================================

#[test]
fn test_thin_arm_removed() {
  let mut g = y_graph(3, 3, 3, [0.5, 2.0]);
  // Left arm: segments weigh 0.5, 0.5 and 1.25 at the junction.
  assert_eq!(prune_thin_branches(&mut g, 1.0, Vec3::ONE), 3);
  assert_eq!(g.leaf_count(), 1);
  let leaf = g.leaves()[0];
  assert_eq!(g[leaf].position, Vec3::new(3.0, 0.0, 3.0));
}

#[test]
fn test_zero_length_run_uses_plain_mean() {
  let mut g = RootGraph::new(node(0.0, 0.0, 0.0, 2.0));
  let root = g.root();
  g.add_child(root, node(0.0, 0.0, 0.0, 0.2)).unwrap();
  assert_eq!(prune_thin_branches(&mut g, 0.5, Vec3::ONE), 1);
}

// =============================================================================
// Properties
// =============================================================================

fn random_tree(steps: &[(u16, i8, i8, i8, f32)]) -> RootGraph {
  let mut g = RootGraph::new(node(0.0, 0.0, 0.0, 1.0));
  let mut ids = vec![g.root()];
  for &(seed, dx, dy, dz, r) in steps {
    let parent = ids[seed as usize % ids.len()];
    let p = g[parent].position + Vec3::new(dx as f32, dy as f32, dz as f32);
    ids.push(g.add_child(parent, Node::new(p, r, 0)).unwrap());
  }
  g
}

proptest! {
  #[test]
  fn prop_prune_short_fixpoint(
    steps in prop::collection::vec((any::<u16>(), -3i8..=3, -3i8..=3, -3i8..=3, 0.0f32..4.0), 0..60),
    min_len in 0.0f32..20.0,
  ) {
    let mut g = random_tree(&steps);
    let before = g.node_count();
    let removed = prune_short_branches(&mut g, min_len, Vec3::ONE);
    prop_assert_eq!(g.node_count() + removed, before);
    prop_assert!(g.is_well_formed());
    for run in leaf_runs(&g) {
      prop_assert!(run.length(&g, Vec3::ONE) >= min_len);
    }
    let settled = g.clone();
    prop_assert_eq!(prune_short_branches(&mut g, min_len, Vec3::ONE), 0);
    prop_assert_eq!(g, settled);
  }

  #[test]
  fn prop_prune_thin_never_grows(
    steps in prop::collection::vec((any::<u16>(), -3i8..=3, -3i8..=3, -3i8..=3, 0.0f32..4.0), 0..60),
    min_radius in 0.0f32..3.0,
  ) {
    let mut g = random_tree(&steps);
    let before = g.node_count();
    prune_thin_branches(&mut g, min_radius, Vec3::ONE);
    prop_assert!(g.node_count() <= before);
    prop_assert!(g.is_well_formed());
  }
}
