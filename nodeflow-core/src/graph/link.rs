//! Links
//!
//! A link is a directed connection from one output slot to one input slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Unique identifier for a link within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for LinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed connection between an output slot and an input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
}

impl Link {
    /// Whether either endpoint is on the given node.
    pub fn touches(&self, node: NodeId) -> bool {
        self.origin_id == node || self.target_id == node
    }
}
