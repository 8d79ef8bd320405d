//! Weighted diffusion: the similarity policy.
//!
//! Each node splits whatever reaches it across its endpoints in proportion
//! to edge weight:
//!
//! ```text
//!   relative(n, e) = w(e) / Σ w(e')   over the emitting endpoints e' of n
//!   value(child)   = value(parent) × relative(n, e)
//! ```
//!
//! The mass leaving a node never exceeds the mass that entered it, so the
//! signal decays geometrically with hop count and nearer neighbours
//! dominate. Edges with no usable weight are left out of the denominator
//! and never receive messages; a node whose total is zero ends the branch.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::endpoint::{AllEndpoints, Network};
use crate::message::Message;
use crate::model::{Graph, NodeId};
use crate::policy::{Fanout, MessagePolicy};
use crate::weights::{effective, EdgeWeights, Uniform};
use crate::Result;

/// Pruning thresholds for [`WeightedDiffusion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Messages must carry strictly more than this to be scheduled.
    pub epsilon: f64,
    /// Maximum number of hops from the root, if any.
    pub max_depth: Option<usize>,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_depth: None,
        }
    }
}

impl DiffusionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Scalar diffusion policy over `f64` values.
#[derive(Debug, Clone)]
pub struct WeightedDiffusion<W = Uniform> {
    weights: W,
    config: DiffusionConfig,
    totals: HashMap<NodeId, f64>,
}

impl WeightedDiffusion<Uniform> {
    /// Uniform weights over every endpoint of `graph`.
    pub fn uniform(graph: &Graph) -> Result<Self> {
        Self::new(graph, Uniform)
    }
}

impl<W: EdgeWeights> WeightedDiffusion<W> {
    /// Denominators over every endpoint of `graph`.
    pub fn new(graph: &Graph, weights: W) -> Result<Self> {
        Self::for_network(&Network::wire(graph, &AllEndpoints), weights)
    }

    /// Denominators over the endpoints `network` selected. Use this when
    /// propagating with a restrictive selector, so mass is split only among
    /// edges that can actually carry it.
    pub fn for_network(network: &Network<'_>, weights: W) -> Result<Self> {
        let mut totals = HashMap::new();
        for node in network.wired_nodes() {
            let mut total = 0.0;
            for endpoint in network.endpoints(node) {
                if let Some(w) = effective(weights.weight(endpoint.edge)?) {
                    total += w;
                }
            }
            if total > 0.0 {
                totals.insert(node, total);
            }
        }
        debug!(weighted_nodes = totals.len(), "computed diffusion denominators");
        Ok(Self {
            weights,
            config: DiffusionConfig::default(),
            totals,
        })
    }

    pub fn with_config(mut self, config: DiffusionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = Some(max_depth);
        self
    }

    pub fn config(&self) -> &DiffusionConfig {
        &self.config
    }

    pub fn weights(&self) -> &W {
        &self.weights
    }

    /// Sum of usable endpoint weights at `node`.
    pub fn total_weight(&self, node: NodeId) -> f64 {
        self.totals.get(&node).copied().unwrap_or(0.0)
    }
}

impl<W: EdgeWeights> MessagePolicy<f64> for WeightedDiffusion<W> {
    fn test(&self, message: &Message<f64>) -> bool {
        *message.value() > self.config.epsilon
            && self.config.max_depth.is_none_or(|max| message.depth() <= max)
    }

    fn connection_message_value(&self, fanout: &Fanout<'_, f64>) -> Result<Option<f64>> {
        let Some(total) = self.totals.get(&fanout.node.id) else {
            return Ok(None);
        };
        let Some(weight) = effective(self.weights.weight(fanout.candidate)?) else {
            return Ok(None);
        };
        Ok(Some(fanout.parent.value() * weight / total))
    }
}
