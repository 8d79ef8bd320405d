//! Similarity connections and the factories that produce them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collector::ConnectionFactory;
use crate::message::Message;
use crate::model::{Edge, NodeId};
use crate::weights::{weighted_average, EdgeWeights, Uniform};
use crate::Result;

/// Terminal artifact of a run: how strongly `source` reaches `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConnection<T> {
    pub source: NodeId,
    pub target: NodeId,
    pub value: T,
}

impl<T> SimilarityConnection<T> {
    pub fn new(source: NodeId, target: NodeId, value: T) -> Self {
        Self { source, target, value }
    }
}

fn usable(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Divide by the root's self-similarity when it is a usable number.
fn normalized(value: f64, source_value: Option<&f64>) -> f64 {
    match source_value {
        Some(own) if usable(*own) => value / own,
        _ => value,
    }
}

// ============================================================================
// ScalarSimilarity
// ============================================================================

/// Sums every value that reaches a pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarSimilarity {
    /// Divide the sum by the root's seed value.
    pub normalize: bool,
}

impl ScalarSimilarity {
    pub fn normalized() -> Self {
        Self { normalize: true }
    }
}

impl ConnectionFactory<f64> for ScalarSimilarity {
    type Accumulator = f64;
    type Output = f64;

    fn accumulate(&self, accumulator: &mut f64, _edge: &Edge, message: &Message<f64>) {
        *accumulator += *message.value();
    }

    fn create_connection(
        &self,
        source: NodeId,
        target: NodeId,
        source_value: Option<&f64>,
        accumulator: &f64,
    ) -> Result<Option<SimilarityConnection<f64>>> {
        if !usable(*accumulator) {
            return Ok(None);
        }
        let value = if self.normalize {
            normalized(*accumulator, source_value)
        } else {
            *accumulator
        };
        Ok(Some(SimilarityConnection::new(source, target, value)))
    }
}

// ============================================================================
// TypedSimilarity
// ============================================================================

/// Overall similarity with the per-edge-type breakdown it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub overall: f64,
    pub by_type: BTreeMap<String, f64>,
}

/// Sums contributions per type of the edge they arrived on, then reduces
/// them with [`weighted_average`] using the type weights of `W`.
#[derive(Debug, Clone, Default)]
pub struct TypedSimilarity<W = Uniform> {
    weights: W,
    normalize: bool,
}

impl<W: EdgeWeights> TypedSimilarity<W> {
    pub fn new(weights: W) -> Self {
        Self { weights, normalize: false }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

impl<W: EdgeWeights> ConnectionFactory<f64> for TypedSimilarity<W> {
    type Accumulator = BTreeMap<String, f64>;
    type Output = TypedValue;

    fn accumulate(&self, accumulator: &mut Self::Accumulator, edge: &Edge, message: &Message<f64>) {
        *accumulator.entry(edge.edge_type.clone()).or_insert(0.0) += *message.value();
    }

    fn create_connection(
        &self,
        source: NodeId,
        target: NodeId,
        source_value: Option<&f64>,
        accumulator: &Self::Accumulator,
    ) -> Result<Option<SimilarityConnection<TypedValue>>> {
        let by_type: BTreeMap<String, f64> = accumulator
            .iter()
            .filter(|(_, v)| usable(**v))
            .map(|(t, v)| {
                let v = if self.normalize { normalized(*v, source_value) } else { *v };
                (t.clone(), v)
            })
            .collect();
        let overall = weighted_average(
            by_type.iter().map(|(t, v)| (t.as_str(), *v)),
            |t| self.weights.type_weight(t),
        )?;
        Ok(overall
            .filter(|o| usable(*o))
            .map(|overall| SimilarityConnection::new(source, target, TypedValue { overall, by_type })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::model::{Direction, EdgeId};
    use crate::weights::TypeWeights;

    fn arrival(edge: &Edge, value: f64) -> Message<f64> {
        let seed = Arc::new(Message::seed(edge.src, 1.0));
        Message::child(&seed, edge.src, edge.id, Direction::Forward, value)
    }

    #[test]
    fn test_scalar_zero_sum_omitted() {
        let f = ScalarSimilarity::default();
        assert!(f.create_connection(NodeId(1), NodeId(2), Some(&1.0), &0.0).unwrap().is_none());
        assert!(f.create_connection(NodeId(1), NodeId(2), None, &f64::NAN).unwrap().is_none());
    }

    #[test]
    fn test_scalar_normalizes_by_seed() {
        let f = ScalarSimilarity::normalized();
        let c = f.create_connection(NodeId(1), NodeId(2), Some(&2.0), &0.5).unwrap().unwrap();
        assert_eq!(c.value, 0.25);

        let c = f.create_connection(NodeId(1), NodeId(2), Some(&0.0), &0.5).unwrap().unwrap();
        assert_eq!(c.value, 0.5);
    }

    #[test]
    fn test_typed_weighted_average() {
        let weights = TypeWeights::new().with("calls", 3.0).with("imports", 1.0).with("noise", 0.0);
        let f = TypedSimilarity::new(weights);
        let calls = Edge::new(EdgeId(1), NodeId(1), NodeId(2), "calls");
        let imports = Edge::new(EdgeId(2), NodeId(1), NodeId(2), "imports");
        let noise = Edge::new(EdgeId(3), NodeId(1), NodeId(2), "noise");

        let mut acc = BTreeMap::new();
        f.accumulate(&mut acc, &calls, &arrival(&calls, 0.5));
        f.accumulate(&mut acc, &calls, &arrival(&calls, 0.5));
        f.accumulate(&mut acc, &imports, &arrival(&imports, 0.2));
        f.accumulate(&mut acc, &noise, &arrival(&noise, 9.0));

        let c = f.create_connection(NodeId(1), NodeId(2), None, &acc).unwrap().unwrap();
        assert!((c.value.overall - (3.0 * 1.0 + 1.0 * 0.2) / 4.0).abs() < 1e-12);
        assert_eq!(c.value.by_type.len(), 3);
        assert_eq!(c.value.by_type["calls"], 1.0);
    }

    #[test]
    fn test_typed_all_zero_weight_omitted() {
        let f = TypedSimilarity::new(TypeWeights::new());
        let e = Edge::new(EdgeId(1), NodeId(1), NodeId(2), "unlisted");
        let mut acc = BTreeMap::new();
        f.accumulate(&mut acc, &e, &arrival(&e, 0.5));
        assert!(f.create_connection(NodeId(1), NodeId(2), None, &acc).unwrap().is_none());
    }
}
