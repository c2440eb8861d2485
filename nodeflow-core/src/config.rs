//! Graph Configuration
//!
//! Runtime knobs for a [`Graph`](crate::graph::Graph). Every field has a
//! default, so a host only needs to spell out what it changes:
//!
//! ```rust
//! use nodeflow_core::GraphConfig;
//!
//! let config = GraphConfig::from_json_str(r#"{ "max_cascade_depth": 16 }"#).unwrap();
//! assert_eq!(config.max_cascade_depth, 16);
//! assert!(config.catch_panics);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Runtime configuration for a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum nesting of synchronous trigger dispatches.
    /// A trigger beyond this depth is refused with `CascadeDepthExceeded`.
    /// Default: 64.
    pub max_cascade_depth: usize,

    /// Convert panics inside node hooks into `NodeExecution` failures.
    /// Default: true.
    pub catch_panics: bool,

    /// Number of contained failures kept in the graph-level fault log.
    /// The oldest entries are dropped first. Default: 256.
    pub fault_log_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 64,
            catch_panics: true,
            fault_log_capacity: 256,
        }
    }
}

impl GraphConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> GraphResult<Self> {
        let config: GraphConfig =
            serde_json::from_str(json).map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> GraphResult<()> {
        if self.max_cascade_depth == 0 {
            return Err(GraphError::InvalidConfig(
                "max_cascade_depth must be at least 1".to_string(),
            ));
        }
        if self.fault_log_capacity == 0 {
            return Err(GraphError::InvalidConfig(
                "fault_log_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
