//! Root graphs: storage, persistence and measurements.
//!
//! A [`RootGraph`] is a rooted tree of [`Node`]s (position, radius, branch
//! id) kept in a generational arena. Graphs are plain values; a
//! [`GraphStore`] hands them out by [`GraphHandle`] when an owner across an
//! API boundary needs one.
//!
//! # Module Structure
//!
//! - [`node`]: [`Node`] payload and [`NodeId`]
//! - [`root_graph`]: arena, mutation and iterative traversal
//! - [`store`]: [`GraphStore`] arena of graphs
//! - [`xml`]: `<Forest>` document reader and writer
//! - [`transform`]: translate, rotate, zero root
//! - [`raster`]: dense point sampling and centerline rasterization
//! - [`stats`]: branch and node statistics

pub mod node;
pub mod raster;
pub mod root_graph;
pub mod stats;
pub mod store;
pub mod transform;
pub mod xml;

// Re-exports
pub use node::{Node, NodeId};
pub use root_graph::RootGraph;
pub use stats::{BranchStats, NodeStats};
pub use store::{GraphHandle, GraphStore};
