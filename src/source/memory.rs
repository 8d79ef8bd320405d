//! In-memory graph source.
//!
//! This is the reference implementation of `GraphSource`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No persistence**: everything lives in process memory.
//! - **Not atomic across calls**: `nodes()` and `edges()` take separate
//!   locks, so a writer racing a `Graph::load` can produce a snapshot that
//!   fails validation. Finish writing before loading.
//!
//! Use this source for:
//! - Tests of the propagation engine
//! - Embedding where the caller assembles the graph incrementally

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::GraphSource;

// ============================================================================
// MemorySource
// ============================================================================

/// In-memory node and edge store.
#[derive(Clone, Default)]
pub struct MemorySource {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    edges: RwLock<HashMap<EdgeId, Edge>>,
    next_node_id: AtomicU64,
    next_edge_id: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with the given labels and properties.
    pub fn create_node(&self, labels: &[&str], props: PropertyMap) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let node = Node {
            id,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: props,
        };
        self.inner.nodes.write().insert(id, node);
        id
    }

    /// Create an edge between two existing nodes.
    pub fn create_edge(&self, src: NodeId, dst: NodeId, edge_type: &str, value: Option<f64>) -> Result<EdgeId> {
        self.check_endpoints(src, dst)?;
        let id = self.next_edge_id();
        let mut edge = Edge::new(id, src, dst, edge_type);
        edge.value = value;
        self.inner.edges.write().insert(id, edge);
        Ok(id)
    }

    /// Create `a -> b` and `b -> a` as reciprocal counterparts.
    pub fn create_reciprocal_pair(
        &self,
        a: NodeId,
        b: NodeId,
        forward_type: &str,
        backward_type: &str,
    ) -> Result<(EdgeId, EdgeId)> {
        self.check_endpoints(a, b)?;
        let forward = self.next_edge_id();
        let backward = self.next_edge_id();
        let mut edges = self.inner.edges.write();
        edges.insert(forward, Edge::new(forward, a, b, forward_type).with_reciprocal(backward));
        edges.insert(backward, Edge::new(backward, b, a, backward_type).with_reciprocal(forward));
        Ok((forward, backward))
    }

    /// Set a property on a node (upsert).
    pub fn set_node_property(&self, id: NodeId, key: &str, val: serde_json::Value) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        node.properties.insert(key.to_string(), val);
        Ok(())
    }

    /// Delete an edge and its reciprocal pointer on the counterpart.
    pub fn delete_edge(&self, id: EdgeId) -> bool {
        let mut edges = self.inner.edges.write();
        let Some(removed) = edges.remove(&id) else { return false };
        if let Some(counterpart) = removed.reciprocal.and_then(|r| edges.get_mut(&r)) {
            counterpart.reciprocal = None;
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.read().len()
    }

    fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.inner.next_edge_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_endpoints(&self, src: NodeId, dst: NodeId) -> Result<()> {
        let nodes = self.inner.nodes.read();
        if !nodes.contains_key(&src) {
            return Err(Error::NotFound(format!("Source node {src}")));
        }
        if !nodes.contains_key(&dst) {
            return Err(Error::NotFound(format!("Target node {dst}")));
        }
        Ok(())
    }
}

// ============================================================================
// GraphSource impl
// ============================================================================

#[async_trait]
impl GraphSource for MemorySource {
    async fn nodes(&self) -> Result<Vec<Node>> {
        let mut nodes: Vec<Node> = self.inner.nodes.read().values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        Ok(nodes)
    }

    async fn edges(&self) -> Result<Vec<Edge>> {
        let mut edges: Vec<Edge> = self.inner.edges.read().values().cloned().collect();
        edges.sort_by_key(|e| e.id);
        Ok(edges)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_load() {
        let source = MemorySource::new();
        let a = source.create_node(&["Class"], PropertyMap::new());
        let b = source.create_node(&["Class"], PropertyMap::new());
        let e = source.create_edge(a, b, "extends", Some(0.5)).unwrap();

        let graph = Graph::load(&source).await.unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.outgoing(a), &[e]);
        assert_eq!(graph.edge(e).unwrap().value, Some(0.5));
    }

    #[tokio::test]
    async fn test_edge_to_missing_node_fails() {
        let source = MemorySource::new();
        let a = source.create_node(&[], PropertyMap::new());
        let result = source.create_edge(a, NodeId(42), "ref", None);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reciprocal_pair_survives_load() {
        let source = MemorySource::new();
        let a = source.create_node(&[], PropertyMap::new());
        let b = source.create_node(&[], PropertyMap::new());
        let (fwd, back) = source.create_reciprocal_pair(a, b, "parent", "child").unwrap();

        let graph = Graph::load(&source).await.unwrap();
        assert_eq!(graph.reciprocal(fwd).map(|e| e.id), Some(back));
    }

    #[tokio::test]
    async fn test_delete_edge_clears_reciprocal() {
        let source = MemorySource::new();
        let a = source.create_node(&[], PropertyMap::new());
        let b = source.create_node(&[], PropertyMap::new());
        let (fwd, back) = source.create_reciprocal_pair(a, b, "parent", "child").unwrap();

        assert!(source.delete_edge(fwd));
        assert!(!source.delete_edge(fwd));
        let graph = Graph::load(&source).await.unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge(back).unwrap().reciprocal.is_none());
    }

    #[tokio::test]
    async fn test_node_properties() {
        let source = MemorySource::new();
        let a = source.create_node(&["Doc"], PropertyMap::new());
        source.set_node_property(a, "title", serde_json::json!("Intro")).unwrap();
        assert!(source.set_node_property(NodeId(99), "x", serde_json::json!(1)).is_err());

        let graph = Graph::load(&source).await.unwrap();
        assert_eq!(graph.node(a).unwrap().get("title"), Some(&serde_json::json!("Intro")));
    }
}
