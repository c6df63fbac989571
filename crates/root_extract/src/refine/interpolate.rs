//! Douglas-Peucker simplification between structural nodes.
//!
//! Structural nodes (root, branch points, leaves) always survive. Between
//! two of them, an interior node is kept only when it is the farthest point
//! of a span and lies more than `max_diff` from that span's chord.

use glam::Vec3;

use crate::graph::{NodeId, RootGraph};

/// Simplified copy of `graph`. Node payloads are copied unchanged.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "refine::interpolate"))]
pub fn interpolate_graph(graph: &RootGraph, max_diff: f32) -> RootGraph {
  let mut out = RootGraph::new(graph[graph.root()].detached());
  let mut stack = vec![(graph.root(), out.root())];

  while let Some((start, new_start)) = stack.pop() {
    for &first in graph.children(start) {
      let run = run_to_structural(graph, start, first);
      let points: Vec<Vec3> = run.iter().map(|&id| graph[id].position).collect();
      let keep = douglas_peucker(&points, max_diff);

      let mut tail = new_start;
      for (&id, _) in run.iter().zip(&keep).skip(1).filter(|&(_, &k)| k) {
        // `tail` is live in `out`, so this cannot fail.
        match out.add_child(tail, graph[id].detached()) {
          Ok(next) => tail = next,
          Err(_) => break,
        }
      }
      let end = run[run.len() - 1];
      if !graph.children(end).is_empty() {
        stack.push((end, tail));
      }
    }
  }
  out
}

/// `[start, first, ..., end]` where `end` is the first node from `first` on
/// that is not a plain chain link.
fn run_to_structural(graph: &RootGraph, start: NodeId, first: NodeId) -> Vec<NodeId> {
  let mut run = vec![start, first];
  let mut cur = first;
  while let [only] = graph.children(cur) {
    run.push(*only);
    cur = *only;
  }
  run
}

/// Keep-flags for `points`; both ends are always kept.
fn douglas_peucker(points: &[Vec3], max_diff: f32) -> Vec<bool> {
  let n = points.len();
  let mut keep = vec![false; n];
  keep[0] = true;
  keep[n - 1] = true;

  let mut spans = vec![(0, n - 1)];
  while let Some((a, b)) = spans.pop() {
    if b <= a + 1 {
      continue;
    }
    let (far, dist) = (a + 1..b)
      .map(|i| (i, segment_distance(points[i], points[a], points[b])))
      .fold((a + 1, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
    if dist > max_diff {
      keep[far] = true;
      spans.push((far, b));
      spans.push((a, far));
    }
  }
  keep
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
  let ab = b - a;
  let len_sq = ab.length_squared();
  if len_sq == 0.0 {
    return p.distance(a);
  }
  let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
  p.distance(a + ab * t)
}
