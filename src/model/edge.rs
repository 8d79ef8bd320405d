//! Edge (connection) in the propagation graph.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap};

/// Opaque edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traversal direction along an edge.
///
/// `Forward` walks source → target, `Backward` walks target → source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "->"),
            Direction::Backward => write!(f, "<-"),
        }
    }
}

/// A directed, typed edge.
///
/// `reciprocal` points at the edge describing the same relationship in the
/// opposite direction. For such pairs only the forward direction of each
/// edge carries messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub edge_type: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub reciprocal: Option<EdgeId>,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(id: EdgeId, src: NodeId, dst: NodeId, edge_type: impl Into<String>) -> Self {
        Self {
            id,
            src,
            dst,
            edge_type: edge_type.into(),
            value: None,
            reciprocal: None,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_reciprocal(mut self, reciprocal: EdgeId) -> Self {
        self.reciprocal = Some(reciprocal);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_reciprocal(&self) -> bool {
        self.reciprocal.is_some()
    }

    /// Node a message reaches when walking this edge in `direction`.
    pub fn head(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Forward => self.dst,
            Direction::Backward => self.src,
        }
    }

    /// Node a message leaves from when walking this edge in `direction`.
    pub fn tail(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Forward => self.src,
            Direction::Backward => self.dst,
        }
    }

    /// Whether `other` is this edge or its reciprocal counterpart.
    pub fn same_relationship(&self, other: EdgeId) -> bool {
        self.id == other || self.reciprocal == Some(other)
    }
}
