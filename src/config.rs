//! Propagation configuration.

use serde::{Deserialize, Serialize};

use crate::Result;

/// How a run is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Explicit work stack on the calling thread. Exact depth-first order.
    Sequential,
    /// Worker pool over a most-recent-first priority queue.
    /// `threads == 0` uses the available parallelism.
    Concurrent { threads: usize },
}

/// Settings for [`Propagator`](crate::Propagator).
///
/// ```json
/// { "parallel": true, "threads": 8 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub parallel: bool,
    pub threads: usize,
}

impl PropagationConfig {
    pub fn sequential() -> Self {
        Self { parallel: false, threads: 0 }
    }

    pub fn concurrent(threads: usize) -> Self {
        Self { parallel: true, threads }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn execution(&self) -> Execution {
        if self.parallel {
            Execution::Concurrent { threads: self.threads }
        } else {
            Execution::Sequential
        }
    }
}
