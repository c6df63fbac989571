//! Owner of graphs handed across the API by opaque handles.

use super::RootGraph;
use crate::error::{ExtractError, Result};

/// Opaque, generational reference to a graph in a [`GraphStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphHandle {
  index: u32,
  generation: u32,
}

#[derive(Debug, Default)]
struct Entry {
  generation: u32,
  graph: Option<RootGraph>,
}

/// Arena of graphs.
///
/// Released slots are reused with a bumped generation, so handles to a
/// released graph fail with [`ExtractError::StaleHandle`] instead of
/// resolving to whatever took their place.
#[derive(Debug, Default)]
pub struct GraphStore {
  entries: Vec<Entry>,
  free: Vec<u32>,
  len: usize,
}

impl GraphStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, graph: RootGraph) -> GraphHandle {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let entry = &mut self.entries[index as usize];
      entry.graph = Some(graph);
      return GraphHandle {
        index,
        generation: entry.generation,
      };
    }
    self.entries.push(Entry {
      generation: 0,
      graph: Some(graph),
    });
    GraphHandle {
      index: (self.entries.len() - 1) as u32,
      generation: 0,
    }
  }

  pub fn get(&self, handle: GraphHandle) -> Result<&RootGraph> {
    self
      .entries
      .get(handle.index as usize)
      .filter(|e| e.generation == handle.generation)
      .and_then(|e| e.graph.as_ref())
      .ok_or(ExtractError::StaleHandle)
  }

  pub fn get_mut(&mut self, handle: GraphHandle) -> Result<&mut RootGraph> {
    self
      .entries
      .get_mut(handle.index as usize)
      .filter(|e| e.generation == handle.generation)
      .and_then(|e| e.graph.as_mut())
      .ok_or(ExtractError::StaleHandle)
  }

  /// Swap in a new graph under the same handle, returning the old one.
  pub fn replace(&mut self, handle: GraphHandle, graph: RootGraph) -> Result<RootGraph> {
    let slot = self.get_mut(handle)?;
    Ok(std::mem::replace(slot, graph))
  }

  /// Take the graph out of the store and invalidate the handle.
  pub fn release(&mut self, handle: GraphHandle) -> Result<RootGraph> {
    let entry = self
      .entries
      .get_mut(handle.index as usize)
      .filter(|e| e.generation == handle.generation)
      .ok_or(ExtractError::StaleHandle)?;
    let graph = entry.graph.take().ok_or(ExtractError::StaleHandle)?;
    entry.generation = entry.generation.wrapping_add(1);
    self.free.push(handle.index);
    self.len -= 1;
    Ok(graph)
  }

  pub fn contains(&self, handle: GraphHandle) -> bool {
    self.get(handle).is_ok()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Handles of all live graphs.
  pub fn handles(&self) -> Vec<GraphHandle> {
    self
      .entries
      .iter()
      .enumerate()
      .filter(|(_, e)| e.graph.is_some())
      .map(|(i, e)| GraphHandle {
        index: i as u32,
        generation: e.generation,
      })
      .collect()
  }

  /// Drop every graph. Existing handles become stale.
  pub fn clear(&mut self) {
    for handle in self.handles() {
      let _ = self.release(handle);
    }
  }
}
