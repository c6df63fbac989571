//! Rooted tree of [`Node`]s stored in a generational arena.
//!
//! # Layout
//!
//! ```text
//! slots:  [ root | n1 | (free) | n3 | n4 ]      free: [2]
//!            │      ▲             ▲    ▲
//!            └─children──────────┘    │
//!                   └──children───────┘
//! ```
//!
//! Child lists are ordered; the first child continues the parent's branch.
//! Every walk is iterative with an explicit stack, so arbitrarily deep roots
//! never touch the call stack.

use std::ops::{Index, IndexMut};

use super::node::{Node, NodeId};
use crate::error::{ExtractError, Result};

#[derive(Clone, Debug)]
struct Slot {
  generation: u32,
  node: Option<Node>,
}

#[derive(Clone, Debug)]
pub struct RootGraph {
  slots: Vec<Slot>,
  free: Vec<u32>,
  root: NodeId,
  len: usize,
}

impl RootGraph {
  /// Graph holding only `root`.
  pub fn new(root: Node) -> Self {
    let mut graph = Self {
      slots: Vec::new(),
      free: Vec::new(),
      root: NodeId {
        index: 0,
        generation: 0,
      },
      len: 0,
    };
    graph.root = graph.alloc(root.detached());
    graph
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  #[inline]
  pub fn node_count(&self) -> usize {
    self.len
  }

  pub fn edge_count(&self) -> usize {
    self.iter().map(|(_, n)| n.rank()).sum()
  }

  #[inline]
  pub fn contains(&self, id: NodeId) -> bool {
    self.get(id).is_some()
  }

  #[inline]
  pub fn get(&self, id: NodeId) -> Option<&Node> {
    let slot = self.slots.get(id.index())?;
    if slot.generation != id.generation {
      return None;
    }
    slot.node.as_ref()
  }

  #[inline]
  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
    let slot = self.slots.get_mut(id.index())?;
    if slot.generation != id.generation {
      return None;
    }
    slot.node.as_mut()
  }

  #[inline]
  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.get(id).and_then(Node::parent)
  }

  /// Children of `id`, empty for stale ids.
  #[inline]
  pub fn children(&self, id: NodeId) -> &[NodeId] {
    self.get(id).map(Node::children).unwrap_or(&[])
  }

  /// Live nodes in slot order.
  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
    self.slots.iter().enumerate().filter_map(|(i, slot)| {
      slot.node.as_ref().map(|n| {
        (
          NodeId {
            index: i as u32,
            generation: slot.generation,
          },
          n,
        )
      })
    })
  }

  /// Mutable payload access for every live node.
  pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
    self.slots.iter_mut().filter_map(|slot| slot.node.as_mut())
  }

  // ===========================================================================
  // Mutation
  // ===========================================================================

  /// Append `node` as the last child of `parent`.
  pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
    if !self.contains(parent) {
      return Err(ExtractError::StaleHandle);
    }
    let mut node = node.detached();
    node.parent = Some(parent);
    let id = self.alloc(node);
    if let Some(p) = self.get_mut(parent) {
      p.children.push(id);
    }
    Ok(id)
  }

  /// Append `nodes` as a chain below `parent`. Returns the last node, or
  /// `parent` when `nodes` is empty.
  pub fn add_chain(
    &mut self,
    parent: NodeId,
    nodes: impl IntoIterator<Item = Node>,
  ) -> Result<NodeId> {
    let mut tail = parent;
    for node in nodes {
      tail = self.add_child(tail, node)?;
    }
    Ok(tail)
  }

  /// Insert `nodes` as a chain on the edge `parent -> child`, keeping the
  /// child's position in the parent's child list. Returns the number of
  /// inserted nodes.
  pub fn splice_between(
    &mut self,
    parent: NodeId,
    child: NodeId,
    nodes: impl IntoIterator<Item = Node>,
  ) -> Result<usize> {
    let slot = self
      .children(parent)
      .iter()
      .position(|&c| c == child)
      .ok_or(ExtractError::StaleHandle)?;

    let mut inserted = 0;
    let mut tail = parent;
    for node in nodes {
      let mut node = node.detached();
      node.parent = Some(tail);
      let id = self.alloc(node);
      if inserted == 0 {
        if let Some(p) = self.get_mut(parent) {
          p.children[slot] = id;
        }
      } else if let Some(t) = self.get_mut(tail) {
        t.children.push(id);
      }
      tail = id;
      inserted += 1;
    }
    if inserted > 0 {
      if let Some(t) = self.get_mut(tail) {
        t.children.push(child);
      }
      if let Some(c) = self.get_mut(child) {
        c.parent = Some(tail);
      }
    }
    Ok(inserted)
  }

  /// Remove `id` and all of its descendants. The root is never removed.
  /// Returns the number of freed nodes.
  pub fn remove_subtree(&mut self, id: NodeId) -> usize {
    if id == self.root || !self.contains(id) {
      return 0;
    }
    if let Some(parent) = self.parent(id) {
      if let Some(p) = self.get_mut(parent) {
        p.children.retain(|c| *c != id);
      }
    }
    let mut removed = 0;
    let mut stack = vec![id];
    while let Some(cur) = stack.pop() {
      if let Some(node) = self.take(cur) {
        stack.extend(node.children.iter().copied());
        removed += 1;
      }
    }
    removed
  }

  // ===========================================================================
  // Traversal
  // ===========================================================================

  /// Depth-first preorder, children visited in list order.
  ///
  /// A node listed under several parents is visited once.
  pub fn preorder(&self) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(self.len);
    let mut seen = vec![false; self.slots.len()];
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let Some(node) = self.get(id) else {
        continue;
      };
      if std::mem::replace(&mut seen[id.index()], true) {
        continue;
      }
      out.push(id);
      stack.extend(node.children.iter().rev().copied());
    }
    out
  }

  /// Leaves in preorder.
  pub fn leaves(&self) -> Vec<NodeId> {
    self
      .preorder()
      .into_iter()
      .filter(|&id| self.get(id).is_some_and(Node::is_leaf))
      .collect()
  }

  /// `(parent, child)` pairs in preorder of the child.
  pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
    self
      .preorder()
      .into_iter()
      .filter_map(|id| self.parent(id).map(|p| (p, id)))
      .collect()
  }

  pub fn max_branch_id(&self) -> u32 {
    self.iter().map(|(_, n)| n.branch_id).max().unwrap_or(0)
  }

  /// Parent links match child lists, every node is reachable exactly once
  /// from the root, and the root has no parent.
  pub fn is_well_formed(&self) -> bool {
    let Some(root) = self.get(self.root) else {
      return false;
    };
    if root.parent.is_some() {
      return false;
    }
    let mut seen = vec![false; self.slots.len()];
    let mut stack = vec![self.root];
    let mut visited = 0;
    while let Some(id) = stack.pop() {
      if seen[id.index()] {
        return false;
      }
      seen[id.index()] = true;
      visited += 1;
      let Some(node) = self.get(id) else {
        return false;
      };
      for &c in &node.children {
        match self.get(c) {
          Some(child) if child.parent == Some(id) => stack.push(c),
          _ => return false,
        }
      }
    }
    visited == self.len
  }

  // ===========================================================================
  // Arena internals
  // ===========================================================================

  pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.node = Some(node);
      return NodeId {
        index,
        generation: slot.generation,
      };
    }
    self.slots.push(Slot {
      generation: 0,
      node: Some(node),
    });
    NodeId {
      index: (self.slots.len() - 1) as u32,
      generation: 0,
    }
  }

  /// Free a slot without touching any links.
  pub(crate) fn take(&mut self, id: NodeId) -> Option<Node> {
    let slot = self.slots.get_mut(id.index())?;
    if slot.generation != id.generation {
      return None;
    }
    let node = slot.node.take()?;
    slot.generation = slot.generation.wrapping_add(1);
    self.free.push(id.index);
    self.len -= 1;
    Some(node)
  }

  /// Overwrite a parent link without touching child lists.
  pub(crate) fn set_parent_unchecked(&mut self, id: NodeId, parent: Option<NodeId>) {
    if let Some(node) = self.get_mut(id) {
      node.parent = parent;
    }
  }

  /// Replace a child list without touching parent links.
  pub(crate) fn set_children_unchecked(&mut self, id: NodeId, children: &[NodeId]) {
    if let Some(node) = self.get_mut(id) {
      node.children = children.iter().copied().collect();
    }
  }

  /// Ids of all live slots.
  pub(crate) fn ids(&self) -> Vec<NodeId> {
    self.iter().map(|(id, _)| id).collect()
  }
}

impl Index<NodeId> for RootGraph {
  type Output = Node;

  fn index(&self, id: NodeId) -> &Node {
    match self.get(id) {
      Some(node) => node,
      None => panic!("stale node id {id:?}"),
    }
  }
}

impl IndexMut<NodeId> for RootGraph {
  fn index_mut(&mut self, id: NodeId) -> &mut Node {
    match self.get_mut(id) {
      Some(node) => node,
      None => panic!("stale node id {id:?}"),
    }
  }
}

/// Graphs are equal when their preorder walks match in payload and shape.
impl PartialEq for RootGraph {
  fn eq(&self, other: &Self) -> bool {
    if self.len != other.len {
      return false;
    }
    let a = self.preorder();
    let b = other.preorder();
    a.len() == b.len()
      && a.iter().zip(&b).all(|(&x, &y)| {
        let (n, m) = (&self[x], &other[y]);
        n.position == m.position
          && n.radius == m.radius
          && n.branch_id == m.branch_id
          && n.rank() == m.rank()
      })
  }
}

#[cfg(test)]
#[path = "root_graph_test.rs"]
mod root_graph_test;
