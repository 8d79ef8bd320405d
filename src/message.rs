//! Immutable messages and their ancestry chain.
//!
//! Every message points at the message it was derived from, so the chain of
//! parents is exactly the path walked from the root. Chains are shared
//! through `Arc`: fanning out to ten edges clones one pointer per child,
//! never the path.

use std::sync::Arc;

use crate::model::{Direction, EdgeId, NodeId};

/// A value travelling through the graph.
#[derive(Debug)]
pub struct Message<V> {
    sender: NodeId,
    edge: Option<EdgeId>,
    direction: Direction,
    value: V,
    depth: usize,
    parent: Option<Arc<Message<V>>>,
}

impl<V> Message<V> {
    /// Root message seeded at `root`. It has no edge and no parent.
    pub fn seed(root: NodeId, value: V) -> Self {
        Self {
            sender: root,
            edge: None,
            direction: Direction::Forward,
            value,
            depth: 0,
            parent: None,
        }
    }

    /// Message sent by `sender` along `edge` in `direction`, derived from `parent`.
    pub fn child(
        parent: &Arc<Message<V>>,
        sender: NodeId,
        edge: EdgeId,
        direction: Direction,
        value: V,
    ) -> Self {
        Self {
            sender,
            edge: Some(edge),
            direction,
            value,
            depth: parent.depth + 1,
            parent: Some(Arc::clone(parent)),
        }
    }

    /// Node that emitted this message.
    pub fn sender(&self) -> NodeId {
        self.sender
    }

    /// Edge the message travels along. `None` for seeds.
    pub fn edge(&self) -> Option<EdgeId> {
        self.edge
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn parent(&self) -> Option<&Arc<Message<V>>> {
        self.parent.as_ref()
    }

    /// Number of edges walked since the seed.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_seed(&self) -> bool {
        self.parent.is_none()
    }

    /// This message followed by each of its ancestors, nearest first.
    pub fn ancestry(&self) -> Ancestry<'_, V> {
        Ancestry { next: Some(self) }
    }

    /// The seed message this one descends from.
    pub fn root(&self) -> &Message<V> {
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            current = parent;
        }
        current
    }

    /// Node the whole chain was seeded at.
    pub fn root_sender(&self) -> NodeId {
        self.root().sender
    }

    /// Whether `(edge, direction)` was already walked by this message or
    /// any of its ancestors.
    pub fn contains(&self, edge: EdgeId, direction: Direction) -> bool {
        self.ancestry()
            .any(|m| m.edge == Some(edge) && m.direction == direction)
    }

    /// Walked `(edge, direction)` pairs, root first.
    pub fn path(&self) -> Vec<(EdgeId, Direction)> {
        let mut path: Vec<_> = self
            .ancestry()
            .filter_map(|m| m.edge.map(|e| (e, m.direction)))
            .collect();
        path.reverse();
        path
    }
}

// Unlink the chain iteratively so dropping the last handle on a long path
// cannot overflow the stack.
impl<V> Drop for Message<V> {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(parent) = next {
            match Arc::try_unwrap(parent) {
                Ok(mut message) => next = message.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// Iterator over a message and its ancestors.
pub struct Ancestry<'a, V> {
    next: Option<&'a Message<V>>,
}

impl<'a, V> Iterator for Ancestry<'a, V> {
    type Item = &'a Message<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Arc<Message<f64>> {
        let seed = Arc::new(Message::seed(NodeId(1), 1.0));
        let hop1 = Arc::new(Message::child(&seed, NodeId(1), EdgeId(10), Direction::Forward, 0.5));
        Arc::new(Message::child(&hop1, NodeId(2), EdgeId(11), Direction::Backward, 0.25))
    }

    #[test]
    fn test_root_sender_walks_chain() {
        let m = chain();
        assert_eq!(m.root_sender(), NodeId(1));
        assert_eq!(m.sender(), NodeId(2));
        assert_eq!(m.depth(), 2);
        assert!(m.root().is_seed());
    }

    #[test]
    fn test_contains_checks_edge_and_direction() {
        let m = chain();
        assert!(m.contains(EdgeId(10), Direction::Forward));
        assert!(!m.contains(EdgeId(10), Direction::Backward));
        assert!(m.contains(EdgeId(11), Direction::Backward));
        assert!(!m.contains(EdgeId(12), Direction::Forward));
    }

    #[test]
    fn test_path_is_root_first() {
        let m = chain();
        assert_eq!(
            m.path(),
            vec![(EdgeId(10), Direction::Forward), (EdgeId(11), Direction::Backward)]
        );
        assert_eq!(m.ancestry().count(), 3);
    }

    #[test]
    fn test_long_chain_drops() {
        let mut m = Arc::new(Message::seed(NodeId(0), 0u8));
        for i in 0..200_000u64 {
            m = Arc::new(Message::child(&m, NodeId(i), EdgeId(i), Direction::Forward, 0));
        }
        assert_eq!(m.depth(), 200_000);
        drop(m);
    }
}
