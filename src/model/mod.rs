//! # Graph Model
//!
//! Plain DTOs for the graph the engine walks: nodes, directed typed edges
//! with optional reciprocal counterparts, and the read-only [`Graph`] that
//! indexes their adjacency.
//!
//! Design rule: this module is pure data. No engine state, no locks, no I/O.

pub mod node;
pub mod edge;
pub mod graph;
pub mod property_map;

pub use node::{Node, NodeId};
pub use edge::{Edge, EdgeId, Direction};
pub use graph::{Graph, GraphBuilder, EdgeList};
pub use property_map::PropertyMap;
