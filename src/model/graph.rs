//! Read-only adjacency graph consumed by the propagation engine.
//!
//! A [`Graph`] is assembled once through [`GraphBuilder`] (or loaded from a
//! [`GraphSource`](crate::source::GraphSource)) and never mutated afterwards,
//! so worker threads share it by plain reference.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{Edge, EdgeId, Node, NodeId};
use crate::{Error, Result};

/// Edge id list for one side of a node's adjacency.
pub type EdgeList = SmallVec<[EdgeId; 4]>;

/// Immutable node/edge store with per-node incoming and outgoing lists.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, EdgeList>,
    incoming: HashMap<NodeId, EdgeList>,
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Node lookup that reports a missing id as [`Error::NotFound`].
    pub fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    pub fn require_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edge(id).ok_or_else(|| Error::NotFound(format!("Edge {id}")))
    }

    /// Edges whose source is `node`, in insertion order.
    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        self.outgoing.get(&node).map(|l| l.as_slice()).unwrap_or(&[])
    }

    /// Edges whose target is `node`, in insertion order.
    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        self.incoming.get(&node).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn reciprocal(&self, edge: EdgeId) -> Option<&Edge> {
        self.edge(edge)
            .and_then(|e| e.reciprocal)
            .and_then(|r| self.edge(r))
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// All edges, ordered by id.
    pub fn edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.values().collect();
        edges.sort_by_key(|e| e.id);
        edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ============================================================================
// GraphBuilder
// ============================================================================

/// Collects nodes and edges, then validates them into a [`Graph`].
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// `None` once `u64::MAX` is taken.
    next_edge_id: Option<u64>,
    id_space_exhausted: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_edge_id: Some(0),
            id_space_exhausted: false,
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Add a node with just an id and labels.
    pub fn node(&mut self, id: u64, labels: &[&str]) -> NodeId {
        let id = NodeId(id);
        self.nodes.push(Node::new(id).with_labels(labels.iter().copied()));
        id
    }

    /// Add a fully specified edge. Its id must not collide with edges
    /// allocated through [`GraphBuilder::edge`].
    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.next_edge_id = match (self.next_edge_id, edge.id.0.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
        self.edges.push(edge);
        self
    }

    /// Add a plain edge, allocating its id.
    pub fn edge(&mut self, src: NodeId, dst: NodeId, edge_type: &str) -> EdgeId {
        let id = self.allocate_edge_id();
        self.edges.push(Edge::new(id, src, dst, edge_type));
        id
    }

    /// Add `a -> b` and `b -> a` as reciprocal counterparts of one relationship.
    pub fn add_reciprocal_pair(
        &mut self,
        a: NodeId,
        b: NodeId,
        forward_type: &str,
        backward_type: &str,
    ) -> (EdgeId, EdgeId) {
        let forward = self.allocate_edge_id();
        let backward = self.allocate_edge_id();
        self.edges.push(Edge::new(forward, a, b, forward_type).with_reciprocal(backward));
        self.edges.push(Edge::new(backward, b, a, backward_type).with_reciprocal(forward));
        (forward, backward)
    }

    /// Once the id space is used up, allocation hands out a placeholder and
    /// `build` fails.
    fn allocate_edge_id(&mut self) -> EdgeId {
        let Some(next) = self.next_edge_id else {
            self.id_space_exhausted = true;
            return EdgeId(u64::MAX);
        };
        self.next_edge_id = next.checked_add(1);
        EdgeId(next)
    }

    /// Validate and freeze.
    ///
    /// Fails on duplicate ids, edges with a missing endpoint, reciprocal
    /// pointers that dangle or are not mutual, and edge allocation past
    /// `u64::MAX`.
    pub fn build(self) -> Result<Graph> {
        if self.id_space_exhausted {
            return Err(Error::InvalidGraph("edge id space exhausted".into()));
        }
        let mut graph = Graph::default();

        for node in self.nodes {
            let id = node.id;
            if graph.nodes.insert(id, node).is_some() {
                return Err(Error::InvalidGraph(format!("duplicate node {id}")));
            }
        }

        for edge in self.edges {
            for end in [edge.src, edge.dst] {
                if !graph.nodes.contains_key(&end) {
                    return Err(Error::InvalidGraph(format!(
                        "edge {} references missing node {end}",
                        edge.id
                    )));
                }
            }
            graph.outgoing.entry(edge.src).or_default().push(edge.id);
            graph.incoming.entry(edge.dst).or_default().push(edge.id);
            let id = edge.id;
            if graph.edges.insert(id, edge).is_some() {
                return Err(Error::InvalidGraph(format!("duplicate edge {id}")));
            }
        }

        for edge in graph.edges.values() {
            let Some(rid) = edge.reciprocal else { continue };
            let counterpart = graph.edges.get(&rid).ok_or_else(|| {
                Error::InvalidGraph(format!("edge {} has missing reciprocal {rid}", edge.id))
            })?;
            if counterpart.reciprocal != Some(edge.id)
                || counterpart.src != edge.dst
                || counterpart.dst != edge.src
            {
                return Err(Error::InvalidGraph(format!(
                    "edges {} and {rid} are not mutual reciprocals",
                    edge.id
                )));
            }
        }

        Ok(graph)
    }
}
