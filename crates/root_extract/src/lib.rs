//! root_extract - Root system graph extraction from 3D intensity volumes
//!
//! This crate turns a dense, pre-segmented intensity volume of a plant root
//! system into a rooted tree of nodes (position, radius, branch id). The
//! extraction follows the thickness of the roots: every voxel gets a local
//! radius, the thickest voxels of each neighborhood become quench points, and
//! their shortest paths back to the source are merged into a graph.
//!
//! # Features
//!
//! - **Field computation**: radius, comparative and cost fields, parallel on
//!   a bounded rayon pool
//! - **Path forest**: 6/18/26-connected Dijkstra with direction penalty and
//!   gap closing variants
//! - **Skeleton**: quench-point tracing, extension of an existing graph, cut
//!   planes
//! - **Refinement**: repairs, local rebuild, pruning, branch ids,
//!   Douglas-Peucker interpolation
//! - **Pipeline**: memoized stage session, cancellation, iterative expansion,
//!   async and batch execution
//!
//! # Example
//!
//! ```ignore
//! use root_extract::{extract, CancelToken, ExtractionConfig, VoxelGrid};
//!
//! let volume = Arc::new(VoxelGrid::from_vec(dims, intensities)?);
//! let config = ExtractionConfig::default().with_min_branch_length(10.0);
//!
//! let outcome = extract(volume, [64, 64, 0], &config, None, &CancelToken::new())?;
//! if let Some(graph) = outcome.graph() {
//!     root_extract::graph::xml::save(graph, "roots.xml")?;
//! }
//! ```

pub mod error;
pub mod grid;

// Re-export commonly used items
pub use error::{ExtractError, Result};
pub use grid::{Coord, VoxelGrid};

// Cooperative cancellation
pub mod cancel;
pub use cancel::CancelToken;

// Bounded worker pool and task handles
pub mod threading;
pub use threading::{TaskHandle, TaskId, WorkerPool};

// Radius, comparative and cost fields
pub mod cost;
pub use cost::{ComparativeField, CostField, CostParams, RadiusField, RadiusParams};

// Shortest-path forest
pub mod path;
pub use path::{Connectivity, GapMap, GapParams, PathParams, PathSearch, PathTree, SearchVariant};

// Rooted tree, persistence and statistics
pub mod graph;
pub use graph::{GraphHandle, GraphStore, Node, NodeId, RootGraph};

// Quench points to graph
pub mod skeleton;
pub use skeleton::{extract_skeleton, CutPlane, SkeletonParams};

// Post-processing of graphs
pub mod refine;
pub use refine::{RebuildParams, RefineParams};

// Stage session and entry points
pub mod pipeline;
pub use pipeline::{
  expand_iteratively, extract, extract_timed, AsyncExtraction, BatchPipeline, ExpansionParams,
  ExtractionConfig, ExtractionOutcome, ExtractionSession, ExtractionStats, Phase, Stage,
};

// Stage timing history
pub mod metrics;
