//! Edge-type weighting and weighted aggregation.
//!
//! A weight of `None`, zero, a negative number or a non-finite number means
//! "excluded": the edge never carries messages and its contributions never
//! count toward an aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Edge;
use crate::Result;

/// Per-edge weight function, usually keyed on the edge type.
pub trait EdgeWeights: Send + Sync {
    /// Weight of an edge. `Ok(None)` excludes it.
    fn weight(&self, edge: &Edge) -> Result<Option<f64>>;

    /// Weight of an edge type on its own, used when aggregating per-type
    /// contributions. Defaults to uniform.
    fn type_weight(&self, _edge_type: &str) -> Result<Option<f64>> {
        Ok(Some(1.0))
    }
}

/// Normalize a raw weight: anything that is not a positive finite number is
/// treated as absent.
pub fn effective(weight: Option<f64>) -> Option<f64> {
    weight.filter(|w| w.is_finite() && *w > 0.0)
}

/// Weight 1 for every edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl EdgeWeights for Uniform {
    fn weight(&self, _edge: &Edge) -> Result<Option<f64>> {
        Ok(Some(1.0))
    }
}

/// Weights looked up by edge type, with a fallback for unlisted types.
///
/// Deserializable so the weight table can live in configuration:
///
/// ```json
/// { "weights": { "extends": 2.0, "references": 0.5, "generated": 0.0 }, "default": 1.0 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeWeights {
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Weight for types missing from `weights`. `None` excludes them.
    #[serde(default)]
    pub default: Option<f64>,
}

impl TypeWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, edge_type: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(edge_type.into(), weight);
        self
    }

    pub fn with_default(mut self, weight: f64) -> Self {
        self.default = Some(weight);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn lookup(&self, edge_type: &str) -> Option<f64> {
        self.weights.get(edge_type).copied().or(self.default)
    }
}

impl EdgeWeights for TypeWeights {
    fn weight(&self, edge: &Edge) -> Result<Option<f64>> {
        Ok(self.lookup(&edge.edge_type))
    }

    fn type_weight(&self, edge_type: &str) -> Result<Option<f64>> {
        Ok(self.lookup(edge_type))
    }
}

impl<F> EdgeWeights for F
where
    F: Fn(&Edge) -> Result<Option<f64>> + Send + Sync,
{
    fn weight(&self, edge: &Edge) -> Result<Option<f64>> {
        self(edge)
    }
}

/// Weighted average of per-type contributions.
///
/// `total = Σ weight` over contributing types with a usable weight. Returns
/// `None` when nothing contributes or `total` is zero, otherwise
/// `Σ weight × contribution / total`.
pub fn weighted_average<'a, I, W>(contributions: I, weight_of: W) -> Result<Option<f64>>
where
    I: IntoIterator<Item = (&'a str, f64)>,
    W: Fn(&str) -> Result<Option<f64>>,
{
    let mut total_weight = 0.0;
    let mut weighted_sum = 0.0;
    for (edge_type, contribution) in contributions {
        let Some(weight) = effective(weight_of(edge_type)?) else { continue };
        total_weight += weight;
        weighted_sum += weight * contribution;
    }
    if total_weight == 0.0 {
        return Ok(None);
    }
    Ok(Some(weighted_sum / total_weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeId, NodeId};

    fn edge(edge_type: &str) -> Edge {
        Edge::new(EdgeId(1), NodeId(1), NodeId(2), edge_type)
    }

    #[test]
    fn test_type_weights_fallback() {
        let w = TypeWeights::new().with("extends", 2.0);
        assert_eq!(w.weight(&edge("extends")).unwrap(), Some(2.0));
        assert_eq!(w.weight(&edge("other")).unwrap(), None);

        let w = w.with_default(0.5);
        assert_eq!(w.weight(&edge("other")).unwrap(), Some(0.5));
    }

    #[test]
    fn test_type_weights_from_json() {
        let w = TypeWeights::from_json(r#"{"weights": {"a": 3.0}, "default": 1.0}"#).unwrap();
        assert_eq!(w.type_weight("a").unwrap(), Some(3.0));
        assert_eq!(w.type_weight("b").unwrap(), Some(1.0));
    }

    #[test]
    fn test_effective_excludes_zero_and_nan() {
        assert_eq!(effective(Some(0.0)), None);
        assert_eq!(effective(Some(-1.0)), None);
        assert_eq!(effective(Some(f64::NAN)), None);
        assert_eq!(effective(None), None);
        assert_eq!(effective(Some(0.25)), Some(0.25));
    }

    #[test]
    fn test_weighted_average() {
        let weights = TypeWeights::new().with("a", 1.0).with("b", 3.0).with("z", 0.0);
        let avg = weighted_average(
            [("a", 4.0), ("b", 8.0), ("z", 100.0)],
            |t| weights.type_weight(t),
        )
        .unwrap();
        assert_eq!(avg, Some((4.0 + 24.0) / 4.0));
    }

    #[test]
    fn test_weighted_average_empty_is_none() {
        let avg = weighted_average(std::iter::empty(), |_| Ok(Some(1.0))).unwrap();
        assert_eq!(avg, None);

        let avg = weighted_average([("x", 1.0)], |_| Ok(Some(0.0))).unwrap();
        assert_eq!(avg, None);
    }

    #[test]
    fn test_closure_weights_from_edge_property() {
        let w = |e: &Edge| -> Result<Option<f64>> {
            Ok(e.properties.get("strength").and_then(serde_json::Value::as_f64))
        };
        assert_eq!(w.weight(&edge("x").with_property("strength", 2.5)).unwrap(), Some(2.5));
        assert_eq!(w.weight(&edge("x").with_property("strength", "high")).unwrap(), None);
    }

    #[test]
    fn test_closure_weights() {
        let w = |e: &Edge| -> Result<Option<f64>> { Ok(e.value) };
        assert_eq!(w.weight(&edge("x").with_value(0.7)).unwrap(), Some(0.7));
        assert_eq!(w.weight(&edge("x")).unwrap(), None);
    }
}
