//! Graph Data Model
//!
//! This module implements the mutable node graph the scheduler runs over.
//!
//! # Overview
//!
//! - Nodes are instances of registered types. Each has named properties,
//!   an ordered list of input slots and an ordered list of output slots.
//! - Links connect one output slot to one input slot. An input holds at most
//!   one link; an output fans out to any number of them.
//! - Output values live in a table owned by the graph, keyed by
//!   (node, output slot). Unlinked inputs fall back to the node's property of
//!   the same name.
//!
//! # Invariants
//!
//! 1. Linked slot types are compatible (equal tags, a wildcard on either side,
//!    or an `EVENT` output feeding an `ACTION` input).
//! 2. Connecting to an occupied input replaces the old link.
//! 3. Removing a node removes every link touching it, so no link ever refers
//!    to a missing node or slot.
//! 4. Nodes and links keep their insertion order. The scheduler uses node
//!    order as the tie-breaker for everything a dependency order cannot rank.

mod clock;
mod link;
mod node;
mod slot;
mod topology;

pub use clock::{Clock, RunState};
pub use link::{Link, LinkId};
pub use node::{Node, NodeFlags, NodeId, NodeMode, NodeStatus};
pub use slot::{InputSlot, OutputSlot, SlotDescriptor, SlotDirection, SlotRef, SlotType};
pub use topology::Graph;
