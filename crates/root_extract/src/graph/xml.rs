//! XML persistence for root graphs.
//!
//! ```text
//! <?xml version="1.0" ?>
//! <Forest>
//!     <Node id="0" bo="0" rad="3.5" x="10" y="12" z="0">
//!         <Node id="1" bo="0" rad="3.25" x="10" y="12" z="1"/>
//!         ...
//!     </Node>
//! </Forest>
//! ```
//!
//! `id` is the preorder index of the node and `bo` its branch id. Floats are
//! written with the shortest representation that parses back to the same
//! `f32`, so a save/load round trip is exact. Reading and writing are
//! iterative over the streaming event API.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use glam::Vec3;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{Node, NodeId, RootGraph};
use crate::error::{ExtractError, Result};

const DECLARATION: &[u8] = b"<?xml version=\"1.0\" ?>\n";
const FOREST: &str = "Forest";
const NODE: &str = "Node";
const INDENT: usize = 4;

enum Visit {
  Open(NodeId),
  Close,
}

/// Serialize `graph` into `out`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "graph::write_xml"))]
pub fn write_graph<W: Write>(graph: &RootGraph, out: W) -> Result<()> {
  let mut writer = Writer::new_with_indent(out, b' ', INDENT);
  writer.get_mut().write_all(DECLARATION)?;
  writer.write_event(Event::Start(BytesStart::new(FOREST)))?;

  let mut next_id = 0usize;
  let mut stack = vec![Visit::Open(graph.root())];
  while let Some(visit) = stack.pop() {
    match visit {
      Visit::Open(id) => {
        let node = &graph[id];
        let elem = node_element(node, next_id);
        next_id += 1;
        if node.is_leaf() {
          writer.write_event(Event::Empty(elem))?;
        } else {
          writer.write_event(Event::Start(elem))?;
          stack.push(Visit::Close);
          stack.extend(node.children().iter().rev().map(|&c| Visit::Open(c)));
        }
      }
      Visit::Close => writer.write_event(Event::End(BytesEnd::new(NODE)))?,
    }
  }

  writer.write_event(Event::End(BytesEnd::new(FOREST)))?;
  writer.get_mut().write_all(b"\n")?;
  writer.get_mut().flush()?;
  Ok(())
}

fn node_element(node: &Node, id: usize) -> BytesStart<'static> {
  let mut elem = BytesStart::new(NODE);
  elem.push_attribute(("id", id.to_string().as_str()));
  elem.push_attribute(("bo", node.branch_id.to_string().as_str()));
  elem.push_attribute(("rad", node.radius.to_string().as_str()));
  elem.push_attribute(("x", node.position.x.to_string().as_str()));
  elem.push_attribute(("y", node.position.y.to_string().as_str()));
  elem.push_attribute(("z", node.position.z.to_string().as_str()));
  elem
}

pub fn to_xml_string(graph: &RootGraph) -> Result<String> {
  let mut buf = Vec::new();
  write_graph(graph, &mut buf)?;
  String::from_utf8(buf).map_err(|e| ExtractError::malformed(e.to_string()))
}

/// Write `graph` to a file at `path`.
pub fn save(graph: &RootGraph, path: impl AsRef<Path>) -> Result<()> {
  let file = File::create(path)?;
  write_graph(graph, BufWriter::new(file))
}

// =============================================================================
// Reading
// =============================================================================

/// Parse a graph document.
///
/// The first top-level `Node` becomes the root. Documents without one, or
/// with more than one, are rejected.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "graph::read_xml"))]
pub fn read_graph<R: BufRead>(input: R) -> Result<RootGraph> {
  let mut reader = Reader::from_reader(input);
  reader.config_mut().trim_text(true);

  let mut graph: Option<RootGraph> = None;
  let mut open: Vec<NodeId> = Vec::new();
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf)? {
      Event::Start(e) if e.name().as_ref() == NODE.as_bytes() => {
        let node = parse_node(&e, &reader)?;
        let id = attach(&mut graph, open.last().copied(), node)?;
        open.push(id);
      }
      Event::Empty(e) if e.name().as_ref() == NODE.as_bytes() => {
        let node = parse_node(&e, &reader)?;
        attach(&mut graph, open.last().copied(), node)?;
      }
      Event::End(e) if e.name().as_ref() == NODE.as_bytes() => {
        if open.pop().is_none() {
          return Err(ExtractError::malformed("unbalanced </Node>"));
        }
      }
      Event::Eof => break,
      _ => {}
    }
    buf.clear();
  }

  if !open.is_empty() {
    return Err(ExtractError::malformed("unterminated <Node>"));
  }
  graph.ok_or_else(|| ExtractError::malformed("document has no <Node>"))
}

fn attach(graph: &mut Option<RootGraph>, parent: Option<NodeId>, node: Node) -> Result<NodeId> {
  match (graph.as_mut(), parent) {
    (Some(g), Some(parent)) => g.add_child(parent, node),
    (Some(_), None) => Err(ExtractError::malformed("more than one root <Node>")),
    (None, _) => {
      let g = RootGraph::new(node);
      let root = g.root();
      *graph = Some(g);
      Ok(root)
    }
  }
}

fn parse_node<R>(elem: &BytesStart<'_>, reader: &Reader<R>) -> Result<Node> {
  let mut branch_id = None;
  let mut radius = None;
  let mut pos = [None; 3];

  for attr in elem.attributes() {
    let attr = attr.map_err(quick_xml::Error::from)?;
    let value = attr.decode_and_unescape_value(reader.decoder())?;
    match attr.key.as_ref() {
      b"bo" => branch_id = Some(parse_value::<u32>("bo", &value)?),
      b"rad" => radius = Some(parse_value::<f32>("rad", &value)?),
      b"x" => pos[0] = Some(parse_value::<f32>("x", &value)?),
      b"y" => pos[1] = Some(parse_value::<f32>("y", &value)?),
      b"z" => pos[2] = Some(parse_value::<f32>("z", &value)?),
      // Preorder ids are regenerated on write.
      _ => {}
    }
  }

  let missing = |name: &str| ExtractError::malformed(format!("<Node> without `{name}`"));
  let position = Vec3::new(
    pos[0].ok_or_else(|| missing("x"))?,
    pos[1].ok_or_else(|| missing("y"))?,
    pos[2].ok_or_else(|| missing("z"))?,
  );
  let radius = radius.ok_or_else(|| missing("rad"))?;
  if !position.is_finite() {
    return Err(ExtractError::malformed(format!("<Node> position {position} is not finite")));
  }
  if !(radius.is_finite() && radius >= 0.0) {
    return Err(ExtractError::malformed(format!(
      "<Node> radius {radius} is not a finite value >= 0"
    )));
  }
  Ok(Node::new(position, radius, branch_id.unwrap_or(0)))
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
  value
    .trim()
    .parse()
    .map_err(|_| ExtractError::malformed(format!("attribute `{name}` has invalid value {value:?}")))
}

pub fn from_xml_str(s: &str) -> Result<RootGraph> {
  read_graph(s.as_bytes())
}

/// Read a graph from a file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<RootGraph> {
  let file = File::open(path)?;
  read_graph(BufReader::new(file))
}

#[cfg(test)]
#[path = "xml_test.rs"]
mod xml_test;
