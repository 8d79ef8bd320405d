//! Message creation policy.
//!
//! Three creation sites decide what travels where:
//!
//! ```text
//!   node N receives M
//!     └─ for each candidate endpoint (edge E, direction D) of N:
//!          connection_message(M, E, D)      value re-emitted onto E
//!          ├─ D = Forward  → target_message  N → E.dst
//!          └─ D = Backward → source_message  N → E.src
//!          test(child)                       prune or schedule
//! ```
//!
//! Each site returns `Ok(None)` to stop the branch. Every hook is
//! overridable; the defaults pass the parent's value through unchanged.

use std::sync::Arc;

use crate::message::Message;
use crate::model::{Direction, Edge, Node};
use crate::Result;

/// Values that can travel through the engine.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Context handed to [`MessagePolicy::connection_message_value`]: a node
/// that received `parent` is about to re-emit it onto `candidate`.
#[derive(Debug)]
pub struct Fanout<'a, V> {
    /// Edge `parent` arrived on. `None` at a root.
    pub activating_edge: Option<&'a Edge>,
    pub activating_direction: Option<Direction>,
    /// Node doing the re-emission.
    pub node: &'a Node,
    pub candidate: &'a Edge,
    pub direction: Direction,
    pub parent: &'a Arc<Message<V>>,
}

/// Hooks consulted for every message the engine considers creating.
pub trait MessagePolicy<V: Payload>: Send + Sync {
    /// Pruning predicate. Returning `false` drops the branch before it is
    /// scheduled. This is the only early-termination mechanism: ancestry
    /// checks bound every path, but on graphs with many cycles the number
    /// of distinct paths grows exponentially unless this cuts them short.
    fn test(&self, _message: &Message<V>) -> bool {
        true
    }

    /// Value re-emitted from `fanout.node` onto `fanout.candidate`.
    fn connection_message_value(&self, fanout: &Fanout<'_, V>) -> Result<Option<V>> {
        Ok(Some(fanout.parent.value().clone()))
    }

    /// Value of a message travelling target → source along `edge`.
    fn source_message_value(&self, _edge: &Edge, _parent: &Message<V>, value: V) -> Result<Option<V>> {
        Ok(Some(value))
    }

    /// Value of a message travelling source → target along `edge`.
    fn target_message_value(&self, _edge: &Edge, _parent: &Message<V>, value: V) -> Result<Option<V>> {
        Ok(Some(value))
    }

    /// Connection-message creation site.
    fn connection_message(&self, fanout: &Fanout<'_, V>) -> Result<Option<V>> {
        self.connection_message_value(fanout)
    }

    /// Source-message creation site (backward travel).
    ///
    /// Skipped when the edge has a reciprocal counterpart, since the
    /// counterpart's forward direction already carries that relationship,
    /// and when the ancestry already walked `(edge, Backward)`.
    fn source_message(&self, edge: &Edge, parent: &Arc<Message<V>>, value: V) -> Result<Option<Message<V>>> {
        if edge.has_reciprocal() || parent.contains(edge.id, Direction::Backward) {
            return Ok(None);
        }
        let Some(value) = self.source_message_value(edge, parent, value)? else {
            return Ok(None);
        };
        Ok(Some(Message::child(parent, edge.tail(Direction::Backward), edge.id, Direction::Backward, value)))
    }

    /// Target-message creation site (forward travel).
    ///
    /// Skipped when the ancestry already walked `(edge, Forward)`.
    fn target_message(&self, edge: &Edge, parent: &Arc<Message<V>>, value: V) -> Result<Option<Message<V>>> {
        if parent.contains(edge.id, Direction::Forward) {
            return Ok(None);
        }
        let Some(value) = self.target_message_value(edge, parent, value)? else {
            return Ok(None);
        };
        Ok(Some(Message::child(parent, edge.tail(Direction::Forward), edge.id, Direction::Forward, value)))
    }
}

impl<V: Payload, P: MessagePolicy<V> + ?Sized> MessagePolicy<V> for &P {
    fn test(&self, message: &Message<V>) -> bool {
        (**self).test(message)
    }

    fn connection_message_value(&self, fanout: &Fanout<'_, V>) -> Result<Option<V>> {
        (**self).connection_message_value(fanout)
    }

    fn source_message_value(&self, edge: &Edge, parent: &Message<V>, value: V) -> Result<Option<V>> {
        (**self).source_message_value(edge, parent, value)
    }

    fn target_message_value(&self, edge: &Edge, parent: &Message<V>, value: V) -> Result<Option<V>> {
        (**self).target_message_value(edge, parent, value)
    }

    fn connection_message(&self, fanout: &Fanout<'_, V>) -> Result<Option<V>> {
        (**self).connection_message(fanout)
    }

    fn source_message(&self, edge: &Edge, parent: &Arc<Message<V>>, value: V) -> Result<Option<Message<V>>> {
        (**self).source_message(edge, parent, value)
    }

    fn target_message(&self, edge: &Edge, parent: &Arc<Message<V>>, value: V) -> Result<Option<Message<V>>> {
        (**self).target_message(edge, parent, value)
    }
}

/// Unchanged values everywhere, optionally cut off after `max_depth` hops.
///
/// Without a depth limit every path through the graph that repeats no
/// `(edge, direction)` pair gets walked, which explodes on cyclic graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough {
    pub max_depth: Option<usize>,
}

impl PassThrough {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth: Some(max_depth) }
    }
}

impl<V: Payload> MessagePolicy<V> for PassThrough {
    fn test(&self, message: &Message<V>) -> bool {
        self.max_depth.is_none_or(|max| message.depth() <= max)
    }
}
