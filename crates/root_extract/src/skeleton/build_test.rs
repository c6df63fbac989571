use super::*;
use crate::path::{shortest_path, PathParams};
use crate::skeleton::{Axis, CutPlane, CutSide};

/// Cost, radius and comparative fields for a one-voxel-thick corridor.
/// Corridor voxels cost 1 and have radius 1; `tips` get comparative 1.
struct Scene {
  cost: VoxelGrid<f32>,
  radius: VoxelGrid<f32>,
  comparative: VoxelGrid<f32>,
  source: Coord,
}

impl Scene {
  fn new(dims: [usize; 3], source: Coord, corridor: impl Fn(Coord) -> bool, tips: &[Coord]) -> Self {
    Self {
      cost: VoxelGrid::from_fn(dims, |c| if corridor(c) { 1.0 } else { 1000.0 }),
      radius: VoxelGrid::from_fn(dims, |c| if corridor(c) { 1.0 } else { 0.0 }),
      comparative: VoxelGrid::from_fn(dims, |c| if tips.contains(&c) { 1.0 } else { 0.0 }),
      source,
    }
  }

  fn tree(&self) -> PathTree {
    let s = self.source;
    let params = PathParams::new().with_cost_cutoff(1.0e6);
    shortest_path(&self.cost, [s[0] as i64, s[1] as i64, s[2] as i64], &params).unwrap()
  }

  fn run(&self, params: &SkeletonParams, old: Option<&RootGraph>) -> Result<SkeletonOutput> {
    let tree = self.tree();
    let input = SkeletonInput {
      comparative: &self.comparative,
      radius: &self.radius,
      tree: &tree,
      source: self.source,
    };
    extract_skeleton(&input, params, old)
  }
}

const LEFT_TIP: Coord = [1, 1, 12];
const RIGHT_TIP: Coord = [13, 1, 12];

/// Trunk up x = 7 to z = 6, then two diagonal arms to z = 12.
fn is_y(c: Coord) -> bool {
  let [x, y, z] = c;
  let dx = (x as i64 - 7).abs();
  y == 1 && ((x == 7 && z <= 6) || (z > 6 && z <= 12 && dx == z as i64 - 6))
}

fn y_scene(tips: &[Coord]) -> Scene {
  Scene::new([15, 3, 15], [7, 1, 0], is_y, tips)
}

fn branch_ids(g: &RootGraph) -> Vec<u32> {
  let mut ids: Vec<u32> = g.iter().map(|(_, n)| n.branch_id).collect();
  ids.sort_unstable();
  ids.dedup();
  ids
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_y_volume_gives_two_leaves_and_one_junction() {
  let out = y_scene(&[LEFT_TIP, RIGHT_TIP])
    .run(&SkeletonParams::DEFAULT, None)
    .unwrap();
  let g = &out.graph;

  assert!(g.is_well_formed());
  assert_eq!(g.leaf_count(), 2);
  assert_eq!(g.branching_count(), 1);
  assert_eq!(branch_ids(g), vec![0, 1, 2]);
  // Root, 12 voxels for trunk plus the first arm, 6 for the second arm.
  assert_eq!(g.node_count(), 19);

  let junction = g.find_point(Vec3::new(7.0, 1.0, 6.0), 0.1).unwrap();
  assert_eq!(g.children(junction).len(), 2);
  assert_eq!(g[g.root()].position, Vec3::new(7.0, 1.0, 0.0));

  assert_eq!(
    out.stats,
    SkeletonStats {
      quench_points: 2,
      traces: 2,
      discarded: 0,
      skipped_covered: 0,
      nodes_added: 18,
    }
  );
}

#[test]
fn test_first_trace_takes_first_branch_id() {
  let out = y_scene(&[LEFT_TIP, RIGHT_TIP])
    .run(&SkeletonParams::DEFAULT, None)
    .unwrap();
  let g = &out.graph;
  // Equal distances: the lower voxel index is traced first.
  let left = g.find_point(Vec3::new(1.0, 1.0, 12.0), 0.1).unwrap();
  let right = g.find_point(Vec3::new(13.0, 1.0, 12.0), 0.1).unwrap();
  assert_eq!(g[left].branch_id, 1);
  assert_eq!(g[right].branch_id, 2);
  let trunk = g.find_point(Vec3::new(7.0, 1.0, 3.0), 0.1).unwrap();
  assert_eq!(g[trunk].branch_id, 1);
}

#[test]
fn test_nodes_take_radius_and_coverage_is_dilated() {
  let out = y_scene(&[LEFT_TIP]).run(&SkeletonParams::DEFAULT, None).unwrap();
  for (_, node) in out.graph.iter() {
    assert_eq!(node.radius, 1.0);
  }
  // Every node sits inside its own coverage ball, radius ceil(1 * 3).
  assert_eq!(out.coverage[[7, 1, 3]], 1);
  assert_eq!(out.coverage[[10, 1, 3]], 1);
  assert_eq!(out.coverage[[11, 1, 3]], 0);
}

#[test]
fn test_covered_quench_points_are_skipped() {
  // A second maximum right next to the left tip is covered by its ball.
  let out = y_scene(&[LEFT_TIP, [2, 1, 11]])
    .run(&SkeletonParams::DEFAULT, None)
    .unwrap();
  assert_eq!(out.stats.traces, 1);
  assert_eq!(out.stats.skipped_covered, 1);
  assert_eq!(out.graph.leaf_count(), 1);
}

#[test]
fn test_qp_min_dist_filters_near_points() {
  let params = SkeletonParams::new().with_qp_min_dist(20.0);
  let out = y_scene(&[LEFT_TIP, RIGHT_TIP]).run(&params, None).unwrap();
  assert_eq!(out.stats.quench_points, 0);
  assert_eq!(out.graph.node_count(), 1);
}

// =============================================================================
// Cut plane
// =============================================================================

#[test]
fn test_cut_plane_excludes_quench_points() {
  let params = SkeletonParams::new().with_cut_plane(Some(CutPlane::new(Axis::X, CutSide::High, 7)));
  let out = y_scene(&[LEFT_TIP, RIGHT_TIP]).run(&params, None).unwrap();
  assert_eq!(out.stats.quench_points, 1);
  assert_eq!(out.graph.leaf_count(), 1);
  assert_eq!(out.graph.node_count(), 13);
}

#[test]
fn test_trace_leaving_kept_region_is_discarded() {
  // Up x = 1, across z = 6, down x = 4 to the tip at z = 2.
  let hook = |c: Coord| {
    let [x, y, z] = c;
    y == 1 && ((x == 1 && z <= 6) || (z == 6 && (1..=4).contains(&x)) || (x == 4 && (2..=6).contains(&z)))
  };
  let scene = Scene::new([6, 3, 8], [1, 1, 0], hook, &[[4, 1, 2]]);
  let params = SkeletonParams::new().with_cut_plane(Some(CutPlane::new(Axis::Z, CutSide::High, 2)));
  let out = scene.run(&params, None).unwrap();
  assert_eq!(out.stats.quench_points, 1);
  assert_eq!(out.stats.discarded, 1);
  assert_eq!(out.graph.node_count(), 1);
}

// =============================================================================
// Old graphs
// =============================================================================

#[test]
fn test_extension_grows_onto_old_graph() {
  let old = y_scene(&[LEFT_TIP]).run(&SkeletonParams::DEFAULT, None).unwrap().graph;
  assert_eq!(old.node_count(), 13);

  let ext = y_scene(&[LEFT_TIP, RIGHT_TIP])
    .run(&SkeletonParams::DEFAULT, Some(&old))
    .unwrap();
  let g = &ext.graph;
  assert!(g.is_well_formed());
  assert_eq!(ext.stats.skipped_covered, 1);
  assert_eq!(ext.stats.traces, 1);
  // The right arm joins where the old ownership ball (radius 2) starts.
  assert_eq!(g.node_count(), 18);
  assert_eq!(g.leaf_count(), 2);
  assert_eq!(g.max_branch_id(), 2);
  for (_, node) in old.iter() {
    assert!(g.find_point(node.position, 0.1).is_some());
  }
  // The input graph is untouched.
  assert_eq!(old.node_count(), 13);
}

#[test]
fn test_seeding_from_old_leaves_retraces_the_same_tree() {
  let scene = y_scene(&[LEFT_TIP, RIGHT_TIP]);
  let fresh = scene.run(&SkeletonParams::DEFAULT, None).unwrap().graph;

  // No comparative maxima: only the old leaves drive the trace.
  let seeded_scene = y_scene(&[]);
  let params = SkeletonParams::new().with_seed_from_old_leaves(true);
  let seeded = seeded_scene.run(&params, Some(&fresh)).unwrap();
  assert_eq!(seeded.stats.quench_points, 2);
  assert_eq!(seeded.graph, fresh);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_seeding_requires_old_graph() {
  let params = SkeletonParams::new().with_seed_from_old_leaves(true);
  let err = y_scene(&[LEFT_TIP]).run(&params, None).unwrap_err();
  assert!(matches!(err, ExtractError::MissingOldGraph));
}

#[test]
fn test_source_beyond_cut_plane() {
  let params = SkeletonParams::new().with_cut_plane(Some(CutPlane::new(Axis::X, CutSide::Low, 8)));
  let err = y_scene(&[LEFT_TIP]).run(&params, None).unwrap_err();
  assert!(matches!(err, ExtractError::SourceInCutRegion { coord: [7, 1, 0] }));
}

#[test]
fn test_shape_mismatch() {
  let mut scene = y_scene(&[LEFT_TIP]);
  scene.comparative = VoxelGrid::filled([15, 3, 14], 0.0);
  let err = scene.run(&SkeletonParams::DEFAULT, None).unwrap_err();
  assert!(matches!(err, ExtractError::SizeMismatch { .. }));
}

#[test]
fn test_invalid_dilation() {
  let params = SkeletonParams::new().with_dilation(0.0);
  let err = y_scene(&[LEFT_TIP]).run(&params, None).unwrap_err();
  assert!(err.is_config_error());
}
