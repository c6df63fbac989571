use std::collections::BTreeSet;

use glam::Vec3;

use super::*;
use crate::graph::Node;
use crate::pipeline::test_utils::{y_volume, Y_SOURCE};
use crate::refine::{RebuildParams, RefineParams};

fn completed(outcome: ExtractionOutcome) -> Extraction {
  match outcome {
    ExtractionOutcome::Completed(done) => done,
    ExtractionOutcome::Cancelled { phase, .. } => panic!("unexpected cancel in {phase:?}"),
  }
}

#[test]
fn test_phase_from_stage() {
  assert_eq!(Phase::from(Stage::Radius), Phase::Radius);
  assert_eq!(Phase::from(Stage::Paths), Phase::PathSearch);
  assert_eq!(Phase::from(Stage::Skeleton), Phase::Skeleton);
}

#[test]
fn test_y_volume_extracts_rooted_tree() {
  let (outcome, stats) = extract_timed(
    y_volume(),
    Y_SOURCE,
    &ExtractionConfig::DEFAULT,
    None,
    &CancelToken::new(),
  )
  .unwrap();
  let done = completed(outcome);
  let g = &done.graph;

  assert!(g.is_well_formed());
  assert!(g.node_count() > 10);
  assert_eq!(g.leaf_count(), 2);
  assert_eq!(g.branching_count(), 1);
  assert_eq!(g[g.root()].position, Vec3::new(8.0, 4.0, 0.0));
  assert_eq!(g[g.root()].branch_id, 0);
  assert_eq!(done.refine.branch_count, 2);
  let ids: BTreeSet<u32> = g.iter().map(|(_, n)| n.branch_id).collect();
  assert_eq!(ids, BTreeSet::from([0, 1]));
  assert_eq!(stats.node_count, g.node_count());
  assert!(stats.total_us >= stats.refine_us);
}

#[test]
fn test_refine_only_change_reuses_every_stage() {
  let token = CancelToken::new();
  let mut session = ExtractionSession::new(y_volume(), Y_SOURCE, ExtractionConfig::DEFAULT).unwrap();
  let first = completed(session.run(&token).unwrap());

  session
    .set_config(ExtractionConfig::DEFAULT.with_interpolation(1.0))
    .unwrap();
  let (outcome, stats) = session.run_timed(&token).unwrap();
  let second = completed(outcome);

  assert!(Stage::ALL.iter().all(|&s| session.stage_runs(s) == 1));
  assert_eq!(stats.radius_us, 0);
  assert_eq!(stats.paths_us, 0);
  assert!(second.graph.node_count() <= first.graph.node_count());
  assert_eq!(second.refine.interpolated_away, first.graph.node_count() - second.graph.node_count());
}

#[test]
fn test_cancelled_before_start_reports_radius() {
  let token = CancelToken::new();
  token.cancel();
  let outcome = extract(y_volume(), Y_SOURCE, &ExtractionConfig::DEFAULT, None, &token).unwrap();
  match outcome {
    ExtractionOutcome::Cancelled { phase, partial } => {
      assert_eq!(phase, Phase::Radius);
      assert!(partial.is_none());
    }
    ExtractionOutcome::Completed(_) => panic!("cancelled token must stop the run"),
  }
}

#[test]
fn test_cancel_after_skeleton_keeps_partial_graph() {
  let mut session = ExtractionSession::new(y_volume(), Y_SOURCE, ExtractionConfig::DEFAULT).unwrap();
  let token = CancelToken::new();
  assert!(session.ensure(Stage::Skeleton, &token).unwrap());

  token.cancel();
  let outcome = session.run(&token).unwrap();
  assert!(outcome.is_cancelled());
  let partial = outcome.into_graph().unwrap();
  assert_eq!(
    partial.node_count(),
    session.skeleton().unwrap().graph.node_count()
  );
}

#[test]
fn test_rebuild_step_reports_stats() {
  let config = ExtractionConfig::DEFAULT
    .with_refine(RefineParams::DEFAULT.with_rebuild(Some(RebuildParams::DEFAULT)));
  let outcome = extract(y_volume(), Y_SOURCE, &config, None, &CancelToken::new()).unwrap();
  let done = completed(outcome);
  let rebuild = done.refine.rebuild.unwrap();
  assert!(rebuild.edges_checked > 0);
  assert!(done.graph.is_well_formed());
}

#[test]
fn test_thread_count_does_not_change_rebuilt_graph() {
  let refine = RefineParams::DEFAULT.with_rebuild(Some(RebuildParams::DEFAULT));
  let graphs: Vec<RootGraph> = [1, 3]
    .into_iter()
    .map(|threads| {
      let config = ExtractionConfig::DEFAULT.with_refine(refine).with_threads(threads);
      let mut session = ExtractionSession::new(y_volume(), Y_SOURCE, config).unwrap();
      assert_eq!(session.pool().num_threads(), threads);
      completed(session.run(&CancelToken::new()).unwrap()).graph
    })
    .collect();
  assert_eq!(graphs[0], graphs[1]);
}

#[test]
fn test_extension_keeps_old_graph() {
  let mut old = RootGraph::new(Node::new(Vec3::new(8.0, 4.0, 0.0), 1.5, 0));
  let root = old.root();
  old
    .add_chain(root, (1..=6).map(|z| Node::new(Vec3::new(8.0, 4.0, z as f32), 1.5, 0)))
    .unwrap();

  let outcome = extract(
    y_volume(),
    Y_SOURCE,
    &ExtractionConfig::DEFAULT,
    Some(&old),
    &CancelToken::new(),
  )
  .unwrap();
  let g = completed(outcome).graph;
  assert!(g.node_count() > old.node_count());
  assert!(g.find_point(Vec3::new(8.0, 4.0, 6.0), 1.0e-3).is_some());
}

#[test]
fn test_invalid_source_is_an_error() {
  let err = extract(
    y_volume(),
    [0, 0, 40],
    &ExtractionConfig::DEFAULT,
    None,
    &CancelToken::new(),
  )
  .unwrap_err();
  assert!(err.is_input_error());
}
