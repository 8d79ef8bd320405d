//! # Graph Source
//!
//! The contract between the engine and whatever builds the graph. Domain
//! model traversal, parsing and I/O live behind a [`GraphSource`]; the
//! engine only ever sees the frozen [`Graph`] produced by [`Graph::load`].
//!
//! ## Implementations
//!
//! | Source | Module | Description |
//! |--------|--------|-------------|
//! | `MemorySource` | `memory` | In-memory store for tests and embedding |

pub mod memory;

use async_trait::async_trait;
use tracing::debug;

use crate::model::{Edge, Graph, GraphBuilder, Node};
use crate::Result;

pub use memory::MemorySource;

/// Anything that can hand over a complete node and edge set.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Every node of the graph.
    async fn nodes(&self) -> Result<Vec<Node>>;

    /// Every edge of the graph. Endpoints and reciprocal pointers must
    /// refer to nodes and edges returned by this source.
    async fn edges(&self) -> Result<Vec<Edge>>;
}

impl Graph {
    /// Snapshot `source` into an immutable graph.
    pub async fn load<S: GraphSource + ?Sized>(source: &S) -> Result<Graph> {
        let nodes = source.nodes().await?;
        let edges = source.edges().await?;
        debug!(nodes = nodes.len(), edges = edges.len(), "loading graph from source");

        let mut builder = GraphBuilder::new();
        for node in nodes {
            builder.add_node(node);
        }
        for edge in edges {
            builder.add_edge(edge);
        }
        builder.build()
    }
}
