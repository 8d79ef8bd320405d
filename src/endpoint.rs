//! Endpoint wiring.
//!
//! An [`Endpoint`] is one way a message can leave a node: an outgoing edge
//! walked forward, or an incoming edge walked backward. The [`Network`]
//! resolves every node's endpoints once per graph, after the [`Selector`]
//! has had its say, so the hot delivery path never touches adjacency lists.

use hashbrown::HashMap;
use tracing::debug;

use crate::model::{Direction, Edge, Graph, Node, NodeId};

/// A node's handle on one adjacent edge.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'g> {
    /// Node that emits along this endpoint.
    pub node: &'g Node,
    pub edge: &'g Edge,
    pub direction: Direction,
    /// Node a message sent along this endpoint arrives at.
    pub peer: NodeId,
}

impl Endpoint<'_> {
    pub fn edge_type(&self) -> &str {
        &self.edge.edge_type
    }
}

/// Picks which of a node's endpoints take part in propagation.
pub trait Selector: Send + Sync {
    fn select<'g>(&self, endpoints: Vec<Endpoint<'g>>) -> Vec<Endpoint<'g>>;
}

/// Keeps every endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEndpoints;

impl Selector for AllEndpoints {
    fn select<'g>(&self, endpoints: Vec<Endpoint<'g>>) -> Vec<Endpoint<'g>> {
        endpoints
    }
}

/// Keeps only forward or only backward endpoints.
#[derive(Debug, Clone, Copy)]
pub struct OnlyDirection(pub Direction);

impl Selector for OnlyDirection {
    fn select<'g>(&self, mut endpoints: Vec<Endpoint<'g>>) -> Vec<Endpoint<'g>> {
        endpoints.retain(|e| e.direction == self.0);
        endpoints
    }
}

/// Any `Fn(&Endpoint) -> bool` filters endpoints one by one.
impl<F> Selector for F
where
    F: Fn(&Endpoint<'_>) -> bool + Send + Sync,
{
    fn select<'g>(&self, mut endpoints: Vec<Endpoint<'g>>) -> Vec<Endpoint<'g>> {
        endpoints.retain(|e| self(e));
        endpoints
    }
}

/// Candidate endpoints of `node` before selection.
///
/// Outgoing edges walk forward. Incoming edges walk backward unless they
/// have a reciprocal counterpart, whose own forward direction stands in for
/// them.
pub fn candidates<'g>(graph: &'g Graph, node: &'g Node) -> Vec<Endpoint<'g>> {
    let outgoing = graph.outgoing(node.id).iter().filter_map(|id| graph.edge(*id)).map(|edge| Endpoint {
        node,
        edge,
        direction: Direction::Forward,
        peer: edge.head(Direction::Forward),
    });
    let incoming = graph
        .incoming(node.id)
        .iter()
        .filter_map(|id| graph.edge(*id))
        .filter(|edge| !edge.has_reciprocal())
        .map(|edge| Endpoint {
            node,
            edge,
            direction: Direction::Backward,
            peer: edge.head(Direction::Backward),
        });
    outgoing.chain(incoming).collect()
}

/// Per-node endpoint tables, wired once per graph.
#[derive(Debug, Clone)]
pub struct Network<'g> {
    graph: &'g Graph,
    endpoints: HashMap<NodeId, Vec<Endpoint<'g>>>,
}

impl<'g> Network<'g> {
    pub fn wire<S: Selector + ?Sized>(graph: &'g Graph, selector: &S) -> Self {
        let mut endpoints = HashMap::with_capacity(graph.node_count());
        let mut wired = 0usize;
        for node in graph.nodes() {
            let selected = selector.select(candidates(graph, node));
            wired += selected.len();
            if !selected.is_empty() {
                endpoints.insert(node.id, selected);
            }
        }
        debug!(nodes = graph.node_count(), endpoints = wired, "wired propagation network");
        Self { graph, endpoints }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Selected endpoints of `node`; empty for unknown or isolated nodes.
    pub fn endpoints(&self, node: NodeId) -> &[Endpoint<'g>] {
        self.endpoints.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with at least one selected endpoint.
    pub fn wired_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.endpoints.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut b = Graph::builder();
        let a = b.node(1, &[]);
        let c = b.node(2, &[]);
        let d = b.node(3, &[]);
        b.edge(a, c, "calls");
        b.edge(d, a, "uses");
        b.add_reciprocal_pair(a, d, "owns", "owned_by");
        b.build().unwrap()
    }

    #[test]
    fn test_candidates_skip_reciprocal_incoming() {
        let graph = sample();
        let node = graph.node(NodeId(1)).unwrap();
        let found: Vec<_> = candidates(&graph, node)
            .iter()
            .map(|e| (e.edge_type().to_string(), e.direction, e.peer))
            .collect();
        assert_eq!(
            found,
            vec![
                ("calls".to_string(), Direction::Forward, NodeId(2)),
                ("owns".to_string(), Direction::Forward, NodeId(3)),
                ("uses".to_string(), Direction::Backward, NodeId(3)),
            ]
        );
    }

    #[test]
    fn test_closure_selector() {
        let graph = sample();
        let only_calls = |e: &Endpoint<'_>| e.edge_type() == "calls";
        let network = Network::wire(&graph, &only_calls);
        assert_eq!(network.endpoints(NodeId(1)).len(), 1);
        assert!(network.endpoints(NodeId(3)).is_empty());
    }

    #[test]
    fn test_direction_selector() {
        let graph = sample();
        let network = Network::wire(&graph, &OnlyDirection(Direction::Backward));
        let ends = network.endpoints(NodeId(1));
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].peer, NodeId(3));
    }
}
