//! Collectors observe every delivery and accumulate per node pair.
//!
//! The engine reports three events:
//!
//! - `initial(node, value)` when a root's seed message lands,
//! - `incoming(node, edge, message)` for arrivals travelling backward,
//! - `outgoing(node, edge, message)` for arrivals travelling forward.
//!
//! [`AccumulatingCollector`] keys an accumulator by `(root, destination)`
//! and turns the populated ones into [`SimilarityConnection`]s at the end.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::message::Message;
use crate::model::{Edge, Graph, Node, NodeId};
use crate::similarity::SimilarityConnection;
use crate::Result;

/// Sink for delivery events. Called concurrently from worker threads.
pub trait Collector<V>: Sync {
    fn initial(&self, node: &Node, value: &V);

    fn incoming(&self, node: &Node, edge: &Edge, message: &Message<V>);

    fn outgoing(&self, node: &Node, edge: &Edge, message: &Message<V>);
}

/// Folds messages into an accumulator and turns accumulators into
/// connections.
pub trait ConnectionFactory<V>: Send + Sync {
    /// Per-(root, destination) state.
    type Accumulator: Default + Send;
    /// Value carried by the resulting connection.
    type Output;

    /// Merge one delivered message. Runs with the accumulator locked.
    fn accumulate(&self, accumulator: &mut Self::Accumulator, edge: &Edge, message: &Message<V>);

    /// Build the connection for a pair, or `None` to omit it.
    /// `source_value` is the root's own seed value.
    fn create_connection(
        &self,
        source: NodeId,
        target: NodeId,
        source_value: Option<&V>,
        accumulator: &Self::Accumulator,
    ) -> Result<Option<SimilarityConnection<Self::Output>>>;
}

type NodeFilter<'g> = Box<dyn Fn(&Node) -> bool + Send + Sync + 'g>;

/// Collector that accumulates per `(root, destination)` pair.
///
/// The pair map is a `DashMap` and each entry owns its own mutex, so
/// contention stays local to pairs that are written concurrently. Pairs are
/// only accumulated when both nodes pass the optional filter and differ.
pub struct AccumulatingCollector<'g, V, F: ConnectionFactory<V>> {
    graph: &'g Graph,
    factory: F,
    filter: Option<NodeFilter<'g>>,
    initial: DashMap<NodeId, V>,
    accumulators: DashMap<(NodeId, NodeId), Arc<Mutex<F::Accumulator>>>,
}

impl<'g, V, F> AccumulatingCollector<'g, V, F>
where
    V: Clone + Send + Sync,
    F: ConnectionFactory<V>,
{
    pub fn new(graph: &'g Graph, factory: F) -> Self {
        Self {
            graph,
            factory,
            filter: None,
            initial: DashMap::new(),
            accumulators: DashMap::new(),
        }
    }

    /// Only accumulate pairs whose root and destination both satisfy `filter`.
    pub fn with_filter(mut self, filter: impl Fn(&Node) -> bool + Send + Sync + 'g) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Only accumulate between nodes carrying `label`.
    pub fn with_label(self, label: &'g str) -> Self {
        self.with_filter(move |node| node.has_label(label))
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Seed value recorded for `root`, if it was a root of this run.
    pub fn initial_value(&self, root: NodeId) -> Option<V> {
        self.initial.get(&root).map(|v| v.value().clone())
    }

    /// Number of populated `(root, destination)` pairs.
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    fn accumulable(&self, node: &Node) -> bool {
        self.filter.as_ref().is_none_or(|f| f(node))
    }

    fn accumulate(&self, node: &Node, edge: &Edge, message: &Message<V>) {
        let root = message.root_sender();
        if root == node.id || !self.accumulable(node) {
            return;
        }
        match self.graph.node(root) {
            Some(root_node) if self.accumulable(root_node) => {}
            _ => return,
        }
        // Clone the handle out so the shard lock is released before the
        // accumulator lock is taken.
        let accumulator = self
            .accumulators
            .entry((root, node.id))
            .or_default()
            .value()
            .clone();
        self.factory.accumulate(&mut accumulator.lock(), edge, message);
    }

    /// Convert every populated accumulator into a connection, sorted by
    /// `(source, target)`. Pairs the factory rejects are omitted.
    pub fn create_connections(&self) -> Result<Vec<SimilarityConnection<F::Output>>> {
        let mut pairs: Vec<((NodeId, NodeId), Arc<Mutex<F::Accumulator>>)> = self
            .accumulators
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        pairs.sort_by_key(|(key, _)| *key);

        let mut connections = Vec::with_capacity(pairs.len());
        for ((source, target), accumulator) in pairs {
            let source_value = self.initial_value(source);
            let accumulator = accumulator.lock();
            if let Some(connection) =
                self.factory
                    .create_connection(source, target, source_value.as_ref(), &accumulator)?
            {
                connections.push(connection);
            }
        }
        debug!(
            pairs = self.accumulators.len(),
            connections = connections.len(),
            "created similarity connections"
        );
        Ok(connections)
    }
}

impl<V, F> Collector<V> for AccumulatingCollector<'_, V, F>
where
    V: Clone + Send + Sync,
    F: ConnectionFactory<V>,
{
    fn initial(&self, node: &Node, value: &V) {
        self.initial.insert(node.id, value.clone());
    }

    fn incoming(&self, node: &Node, edge: &Edge, message: &Message<V>) {
        self.accumulate(node, edge, message);
    }

    fn outgoing(&self, node: &Node, edge: &Edge, message: &Message<V>) {
        self.accumulate(node, edge, message);
    }
}
