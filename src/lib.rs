//! # propagraph: Message-Passing Similarity Propagation
//!
//! Computes pairwise similarity between nodes of a directed, typed graph by
//! flooding messages outward from root nodes and accumulating what every
//! reached node receives.
//!
//! ## Design Principles
//!
//! 1. **Immutable graph**: `Graph` is frozen before propagation and shared by reference
//! 2. **Immutable messages**: each `Message` links to its parent; the chain *is* the path
//! 3. **Policy at the seams**: `MessagePolicy`, `EdgeWeights`, `Selector`, `Collector`
//!    and `ConnectionFactory` are resolved at compile time through generics
//! 4. **Local locking**: one mutex per `(root, destination)` accumulator, no global lock
//!
//! ## Quick Start
//!
//! ```rust
//! use propagraph::{
//!     AccumulatingCollector, Graph, PropagationConfig, Propagator,
//!     ScalarSimilarity, WeightedDiffusion,
//! };
//!
//! # fn main() -> propagraph::Result<()> {
//! let mut b = Graph::builder();
//! let a = b.node(1, &["Class"]);
//! let m = b.node(2, &["Class"]);
//! let c = b.node(3, &["Class"]);
//! b.edge(a, m, "calls");
//! b.edge(m, c, "calls");
//! let graph = b.build()?;
//!
//! let policy = WeightedDiffusion::uniform(&graph)?.with_epsilon(0.01);
//! let collector = AccumulatingCollector::new(&graph, ScalarSimilarity::default());
//! Propagator::new(&graph, policy)
//!     .with_config(PropagationConfig::concurrent(4))
//!     .propagate(1.0, &[a], &collector)?;
//!
//! for conn in collector.create_connections()? {
//!     println!("{} -> {}: {:.3}", conn.source, conn.target, conn.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Schedulers
//!
//! | Mode | Config | Order |
//! |------|--------|-------|
//! | Sequential | `parallel: false` | exact depth-first |
//! | Concurrent | `parallel: true, threads: N` | most-recent-first, approximately depth-first |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod message;
pub mod policy;
pub mod weights;
pub mod diffusion;
pub mod endpoint;
pub mod scheduler;
pub mod collector;
pub mod similarity;
pub mod engine;
pub mod config;
pub mod source;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeId, Edge, EdgeId, Direction,
    Graph, GraphBuilder, PropertyMap,
};
pub use message::Message;

// ============================================================================
// Re-exports: Policies
// ============================================================================

pub use policy::{MessagePolicy, Fanout, PassThrough, Payload};
pub use weights::{EdgeWeights, Uniform, TypeWeights, weighted_average};
pub use diffusion::{WeightedDiffusion, DiffusionConfig};
pub use endpoint::{Endpoint, Selector, AllEndpoints, OnlyDirection, Network};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use engine::{Propagator, PropagationStats, propagate};
pub use scheduler::{Scheduler, StackScheduler, PoolScheduler};
pub use config::{PropagationConfig, Execution};

// ============================================================================
// Re-exports: Collection
// ============================================================================

pub use collector::{Collector, AccumulatingCollector, ConnectionFactory};
pub use similarity::{SimilarityConnection, ScalarSimilarity, TypedSimilarity, TypedValue};

// ============================================================================
// Re-exports: Boundaries
// ============================================================================

pub use source::{GraphSource, MemorySource};
pub use export::{export_json, export_json_lines};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Graph source error: {0}")]
    Source(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
