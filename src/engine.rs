//! The propagation engine.
//!
//! ```text
//! roots ──seed──▶ Scheduler ──Delivery──▶ deliver()
//!                     ▲                      │ Collector::{initial,incoming,outgoing}
//!                     │                      │ for each endpoint of the node:
//!                     └──── children ◀───────┘   policy: connection → source/target → test
//! ```
//!
//! A run ends when no further message passes the policy's `test`.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashSet;
use serde::Serialize;
use tracing::{debug, trace};

use crate::collector::Collector;
use crate::config::{Execution, PropagationConfig};
use crate::endpoint::{AllEndpoints, Network, Selector};
use crate::message::Message;
use crate::model::{Direction, Graph, NodeId};
use crate::policy::{Fanout, MessagePolicy, Payload};
use crate::scheduler::{PoolScheduler, Scheduler, StackScheduler};
use crate::Result;

/// Counters for one `propagate` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationStats {
    pub roots: usize,
    /// Messages handed to the collector.
    pub delivered: u64,
    /// Candidates a creation site declined (ancestry, reciprocal, `None` value).
    pub skipped: u64,
    /// Messages created but rejected by the pruning predicate.
    pub pruned: u64,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    skipped: AtomicU64,
    pruned: AtomicU64,
}

/// One pending message delivery.
struct Delivery<V> {
    node: NodeId,
    message: Arc<Message<V>>,
}

/// Floods messages from root nodes through a wired [`Network`].
///
/// The network is wired once at construction; every `propagate` call after
/// that only reads it, so one propagator serves any number of runs.
pub struct Propagator<'g, V, P> {
    network: Network<'g>,
    policy: P,
    config: PropagationConfig,
    _value: PhantomData<fn(V)>,
}

impl<'g, V: Payload, P: MessagePolicy<V>> Propagator<'g, V, P> {
    /// Propagator over every endpoint of `graph`.
    pub fn new(graph: &'g Graph, policy: P) -> Self {
        Self::with_network(Network::wire(graph, &AllEndpoints), policy)
    }

    /// Propagator over the endpoints `selector` keeps.
    pub fn with_selector<S: Selector + ?Sized>(graph: &'g Graph, policy: P, selector: &S) -> Self {
        Self::with_network(Network::wire(graph, selector), policy)
    }

    pub fn with_network(network: Network<'g>, policy: P) -> Self {
        Self {
            network,
            policy,
            config: PropagationConfig::default(),
            _value: PhantomData,
        }
    }

    pub fn with_config(mut self, config: PropagationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn network(&self) -> &Network<'g> {
        &self.network
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Seed every root with `root_value` and propagate until no message
    /// passes the policy's `test`.
    ///
    /// Roots are deduplicated; an unknown root is an error. An empty root
    /// set completes immediately without touching the collector.
    ///
    /// On cyclic graphs the amount of work is bounded only by the policy: a
    /// non-decaying value with an always-true `test` walks every path that
    /// repeats no `(edge, direction)` pair, and there can be exponentially
    /// many of those.
    pub fn propagate<C>(&self, root_value: V, roots: &[NodeId], collector: &C) -> Result<PropagationStats>
    where
        C: Collector<V> + ?Sized,
    {
        let started = Instant::now();
        let graph = self.network.graph();
        let counters = Counters::default();

        let mut unique = HashSet::with_capacity(roots.len());
        let mut seeds = Vec::with_capacity(roots.len());
        for &root in roots {
            if !unique.insert(root) {
                continue;
            }
            graph.require_node(root)?;
            let seed = Message::seed(root, root_value.clone());
            if !self.policy.test(&seed) {
                counters.pruned.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            seeds.push(Delivery { node: root, message: Arc::new(seed) });
        }

        debug!(
            roots = unique.len(),
            execution = ?self.config.execution(),
            "propagation started"
        );

        let job = |delivery: Delivery<V>, spawned: &mut Vec<Delivery<V>>| {
            self.deliver(delivery, collector, &counters, spawned)
        };
        match self.config.execution() {
            Execution::Sequential => StackScheduler.run(seeds, job)?,
            Execution::Concurrent { threads } => PoolScheduler::new(threads).run(seeds, job)?,
        }

        let stats = PropagationStats {
            roots: unique.len(),
            delivered: counters.delivered.into_inner(),
            skipped: counters.skipped.into_inner(),
            pruned: counters.pruned.into_inner(),
            elapsed: started.elapsed(),
        };
        debug!(
            delivered = stats.delivered,
            skipped = stats.skipped,
            pruned = stats.pruned,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "propagation finished"
        );
        Ok(stats)
    }

    /// Hand one message to the collector, then fan it out.
    fn deliver<C>(
        &self,
        delivery: Delivery<V>,
        collector: &C,
        counters: &Counters,
        spawned: &mut Vec<Delivery<V>>,
    ) -> Result<()>
    where
        C: Collector<V> + ?Sized,
    {
        let graph = self.network.graph();
        let node = graph.require_node(delivery.node)?;
        let message = &delivery.message;

        let activating = match message.edge() {
            Some(id) => Some(graph.require_edge(id)?),
            None => None,
        };
        match activating {
            None => collector.initial(node, message.value()),
            Some(edge) => match message.direction() {
                Direction::Forward => collector.outgoing(node, edge, message),
                Direction::Backward => collector.incoming(node, edge, message),
            },
        }
        counters.delivered.fetch_add(1, Ordering::Relaxed);
        trace!(node = %node.id, depth = message.depth(), "delivered");

        for endpoint in self.network.endpoints(node.id) {
            // Never walk the arrival relationship straight back.
            if activating.is_some_and(|edge| edge.same_relationship(endpoint.edge.id)) {
                continue;
            }

            let fanout = Fanout {
                activating_edge: activating,
                activating_direction: activating.map(|_| message.direction()),
                node,
                candidate: endpoint.edge,
                direction: endpoint.direction,
                parent: message,
            };
            let Some(value) = self.policy.connection_message(&fanout)? else {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let child = match endpoint.direction {
                Direction::Forward => self.policy.target_message(endpoint.edge, message, value)?,
                Direction::Backward => self.policy.source_message(endpoint.edge, message, value)?,
            };
            let Some(child) = child else {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            if !self.policy.test(&child) {
                counters.pruned.fetch_add(1, Ordering::Relaxed);
                trace!(edge = %endpoint.edge.id, depth = child.depth(), "pruned");
                continue;
            }
            spawned.push(Delivery {
                node: endpoint.peer,
                message: Arc::new(child),
            });
        }
        Ok(())
    }
}

/// One-shot propagation: wire `graph` with `selector`, run from `roots`
/// and report every delivery to `collector`.
///
/// `WeightedDiffusion::uniform` and `WeightedDiffusion::new` split mass over
/// every endpoint. With a restrictive selector, build the policy with
/// [`WeightedDiffusion::for_network`](crate::WeightedDiffusion::for_network)
/// over the same selector, or the dropped endpoints keep their share.
#[allow(clippy::too_many_arguments)]
pub fn propagate<V, P, S, C>(
    graph: &Graph,
    policy: P,
    root_value: V,
    roots: &[NodeId],
    selector: &S,
    collector: &C,
    parallel: bool,
    threads: usize,
) -> Result<PropagationStats>
where
    V: Payload,
    P: MessagePolicy<V>,
    S: Selector + ?Sized,
    C: Collector<V> + ?Sized,
{
    Propagator::with_selector(graph, policy, selector)
        .with_config(PropagationConfig { parallel, threads })
        .propagate(root_value, roots, collector)
}
