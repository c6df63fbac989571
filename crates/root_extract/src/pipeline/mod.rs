//! Extraction Pipeline
//!
//! Memoized stages turn an intensity volume into a root graph, followed by
//! ordered refinement of the graph.
//!
//! ```text
//! ┌────────┐     ┌─────────────┐     ┌──────┐     ┌───────┐     ┌──────────┐     ┌────────────┐
//! │ Radius ├────►│ Comparative ├────►│ Cost ├────►│ Paths ├────►│ Skeleton ├────►│ Refinement │
//! └────────┘     └─────────────┘     └──────┘     └───────┘     └──────────┘     └────────────┘
//!     │                 │                │            │               │                 │
//! RadiusField   ComparativeField     CostField     PathTree      SkeletonOutput     RootGraph
//!                                                                                   (final)
//!                ┌───────────┐
//!                │ Expansion │──► Paths ──► Skeleton ──► ... (windowed, repeated)
//!                └───────────┘
//! ```
//!
//! # Stages
//!
//! 1. **Radius**: local thickness by sphere growing
//! 2. **Comparative**: relative radius inside a window, marks quench points
//! 3. **Cost**: traversal cost from intensity and radius
//! 4. **Paths**: shortest-path forest from the source (plain, direction
//!    penalty, or gap closing)
//! 5. **Skeleton**: traces quench points back to the source into a graph
//! 6. **Refinement**: repairs, rebuild, pruning, branch ids, interpolation
//!
//! An [`ExtractionSession`] caches stages 1-5 so a parameter change reruns
//! only what it affects. [`expand_iteratively`] runs stages 4-5 repeatedly in
//! a window growing around the source.

pub mod config;
pub mod session;

// Stage orchestration
pub mod expansion;
pub mod process;
pub mod refinement;
pub mod async_process;

// Test utilities
#[cfg(test)]
pub mod test_utils;

// Re-exports
pub use crate::cancel::CancelToken;
pub use config::ExtractionConfig;
pub use session::{ExtractionSession, SessionId, Stage};

// Synchronous entry points
pub use expansion::{expand_iteratively, window_half_extents, ExpansionMode, ExpansionParams};
pub use process::{extract, extract_timed, Extraction, ExtractionOutcome, ExtractionStats, Phase};
pub use refinement::{refine_graph, RefineFields, RefineProgress, RefineReport};

// Async entry points (non-blocking)
pub use async_process::{AsyncExtraction, BatchId, BatchPipeline, BatchResult};
