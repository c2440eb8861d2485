//! Graph Nodes
//!
//! This module defines the node instances that live in a [`Graph`](super::Graph).
//! A node couples the data the engine manages (properties, slots, flags,
//! status, error indicator) with the behavior supplied by its registered type.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::slot::{InputSlot, OutputSlot, SlotDescriptor, SlotDirection, SlotRef};
use crate::behavior::{Capabilities, NodeBehavior};
use crate::error::GraphError;
use crate::Value;

/// Unique identifier for a node in a graph.
///
/// Identifiers are assigned by the graph when a node is added, starting at 1.
/// A node that has not been added yet reports [`NodeId::UNASSIGNED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const UNASSIGNED: NodeId = NodeId(0);

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When a node takes part in execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    /// Runs every tick and reacts to actions.
    #[default]
    Always,
    /// Only reacts to actions; skipped by the pull pass.
    OnEvent,
    /// Muted: neither executes nor reacts.
    Never,
}

/// Lifecycle position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Built by the registry, not yet in a graph.
    Created,
    /// In a graph that is not running.
    Added,
    /// In a running graph.
    Started,
    /// In a paused graph.
    Paused,
    /// Taken out of its graph.
    Removed,
}

/// Presentation flags persisted with the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFlags {
    /// Drawn as its title bar only.
    pub collapsed: bool,
    /// Cannot be dragged.
    pub pinned: bool,
}

/// A node in the graph.
pub struct Node {
    /// Assigned by the graph, [`NodeId::UNASSIGNED`] until then.
    id: NodeId,
    /// Registered type this node was created from.
    type_name: String,
    /// Display title, the type's title by default.
    pub title: String,
    /// Named values, in declaration order. An unlinked input reads the
    /// property with its own name.
    pub properties: IndexMap<String, Value>,
    /// Input slots, each fed by at most one link.
    inputs: Vec<InputSlot>,
    /// Output slots, each fanning out to any number of links.
    outputs: Vec<OutputSlot>,
    /// Presentation flags.
    pub flags: NodeFlags,
    /// Execution mode.
    pub mode: NodeMode,
    /// Canvas position.
    pub pos: [f32; 2],
    /// Canvas size, the type's declared size by default.
    pub size: [f32; 2],
    /// Lifecycle position.
    status: NodeStatus,
    /// Failure from the last hook that failed, cleared by the next
    /// successful `on_execute`.
    error: Option<GraphError>,
    /// Cached from the type at registration.
    capabilities: Capabilities,
    /// `None` while one of the behavior's hooks is running.
    behavior: Option<Box<dyn NodeBehavior>>,
}

impl Node {
    pub(crate) fn new(
        type_name: impl Into<String>,
        title: impl Into<String>,
        capabilities: Capabilities,
        behavior: Box<dyn NodeBehavior>,
    ) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            type_name: type_name.into(),
            title: title.into(),
            properties: IndexMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            flags: NodeFlags::default(),
            mode: NodeMode::default(),
            pos: [0.0, 0.0],
            size: [140.0, 26.0],
            status: NodeStatus::Created,
            error: None,
            capabilities,
            behavior: Some(behavior),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The registered type this node was created from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The failure recorded by the scheduler for this node, if its last hook
    /// invocation failed.
    pub fn error(&self) -> Option<&GraphError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&InputSlot> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&OutputSlot> {
        self.outputs.get(index)
    }

    /// Append an input slot and return its index.
    pub fn add_input(&mut self, descriptor: SlotDescriptor) -> usize {
        self.inputs.push(InputSlot::new(descriptor));
        self.inputs.len() - 1
    }

    /// Append an output slot and return its index.
    pub fn add_output(&mut self, descriptor: SlotDescriptor) -> usize {
        self.outputs.push(OutputSlot::new(descriptor));
        self.outputs.len() - 1
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn find_input(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|slot| slot.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|slot| slot.name == name)
    }

    /// Resolve a slot reference against the node's current slots.
    pub fn resolve_slot(&self, direction: SlotDirection, slot: &SlotRef) -> Option<usize> {
        match (direction, slot) {
            (SlotDirection::Input, SlotRef::Index(i)) => (*i < self.inputs.len()).then_some(*i),
            (SlotDirection::Output, SlotRef::Index(i)) => (*i < self.outputs.len()).then_some(*i),
            (SlotDirection::Input, SlotRef::Name(name)) => self.find_input(name),
            (SlotDirection::Output, SlotRef::Name(name)) => self.find_output(name),
        }
    }

    /// Whether the pull pass should run this node.
    pub fn runs_in_pull_pass(&self) -> bool {
        self.mode == NodeMode::Always && self.capabilities.execute
    }

    /// Whether triggers should be delivered to this node.
    pub fn accepts_actions(&self) -> bool {
        self.mode != NodeMode::Never && self.capabilities.action
    }

    pub(crate) fn assign_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub(crate) fn set_error(&mut self, error: Option<GraphError>) {
        self.error = error;
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputSlot] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputSlot] {
        &mut self.outputs
    }

    /// Replace the slot layout, dropping any link bookkeeping.
    pub(crate) fn replace_slots(&mut self, inputs: Vec<SlotDescriptor>, outputs: Vec<SlotDescriptor>) {
        self.inputs = inputs.into_iter().map(InputSlot::new).collect();
        self.outputs = outputs.into_iter().map(OutputSlot::new).collect();
    }

    pub(crate) fn behavior(&self) -> Option<&dyn NodeBehavior> {
        self.behavior.as_deref()
    }

    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn NodeBehavior>> {
        self.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, behavior: Box<dyn NodeBehavior>) {
        self.behavior = Some(behavior);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("title", &self.title)
            .field("status", &self.status)
            .field("mode", &self.mode)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("error", &self.error)
            .finish()
    }
}
