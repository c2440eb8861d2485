//! Graph Topology
//!
//! The [`Graph`] owns every node and link, the per-slot value table, the
//! clock, and the run state. This module covers structural edits; ticking and
//! trigger propagation live in [`crate::scheduler`], persistence in
//! [`crate::document`].
//!
//! Every structural change bumps [`Graph::version`], which is how the
//! scheduler knows its cached execution order is stale.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::clock::{Clock, RunState};
use super::link::{Link, LinkId};
use super::node::{Node, NodeId, NodeStatus};
use super::slot::{SlotDescriptor, SlotDirection, SlotRef, SlotType};
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult, Hook};
use crate::registry::Registry;
use crate::scheduler::ExecutionOrder;
use crate::Value;

/// A slot found either on the node already or among the ones it offers on
/// demand.
enum Candidate {
    Existing(usize),
    Offered(SlotDescriptor),
}

/// A mutable graph of typed nodes connected by typed links.
pub struct Graph {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: GraphConfig,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) links: IndexMap<LinkId, Link>,
    /// Last committed value of every data output, keyed by (node, slot).
    pub(crate) values: HashMap<(NodeId, usize), Value>,
    pub(crate) last_node_id: u64,
    pub(crate) last_link_id: u64,
    pub(crate) version: u64,
    pub(crate) clock: Clock,
    pub(crate) state: RunState,
    pub(crate) order: ExecutionOrder,
    pub(crate) faults: VecDeque<GraphError>,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: GraphConfig::default(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            values: HashMap::new(),
            last_node_id: 0,
            last_link_id: 0,
            version: 0,
            clock: Clock::default(),
            state: RunState::Stopped,
            order: ExecutionOrder::default(),
            faults: VecDeque::new(),
        }
    }

    /// Create an empty graph with a validated configuration.
    pub fn with_config(registry: Arc<Registry>, config: GraphConfig) -> GraphResult<Self> {
        config.validate()?;
        let mut graph = Self::new(registry);
        graph.config = config;
        Ok(graph)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Incremented on every structural change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Instantiate a registered type and add it to the graph.
    pub fn create_node(&mut self, type_name: &str) -> GraphResult<NodeId> {
        let node = self.registry.create(type_name)?;
        self.add(node)
    }

    /// Add a node, assigning it a fresh ID.
    ///
    /// Calls `on_added`, and `on_start` as well when the graph is not stopped.
    /// Fails with `IdsExhausted` once the counter has reached `u64::MAX`.
    pub fn add(&mut self, node: Node) -> GraphResult<NodeId> {
        let next = self
            .last_node_id
            .checked_add(1)
            .ok_or(GraphError::IdsExhausted("node"))?;
        let id = NodeId::from(next);
        self.insert_node(id, node);
        Ok(id)
    }

    pub(crate) fn insert_node(&mut self, id: NodeId, mut node: Node) {
        node.assign_id(id);
        node.set_status(NodeStatus::Added);
        tracing::debug!(node = %id, node_type = node.type_name(), "node added");
        self.nodes.insert(id, node);
        self.last_node_id = self.last_node_id.max(id.raw());
        self.touch();

        let _ = self.lifecycle(id, Hook::Added);
        if self.state != RunState::Stopped {
            let _ = self.lifecycle(id, Hook::Start);
            let status = match self.state {
                RunState::Paused => NodeStatus::Paused,
                _ => NodeStatus::Started,
            };
            if let Some(node) = self.nodes.get_mut(&id) {
                node.set_status(status);
            }
        }
    }

    /// Remove a node and every link touching it.
    ///
    /// A node removed from a live graph receives `on_stop` before
    /// `on_removed`.
    pub fn remove(&mut self, id: NodeId) -> GraphResult<Node> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        if self.state != RunState::Stopped {
            let _ = self.lifecycle(id, Hook::Stop);
        }
        let _ = self.lifecycle(id, Hook::Removed);

        let touching: Vec<LinkId> = self
            .links
            .values()
            .filter(|link| link.touches(id))
            .map(|link| link.id)
            .collect();
        for link in touching {
            self.detach_link(link);
        }
        self.values.retain(|(node, _), _| *node != id);

        let mut node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        node.set_status(NodeStatus::Removed);
        self.touch();
        tracing::debug!(node = %id, "node removed");
        Ok(node)
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let _ = self.remove(id);
        }
        self.values.clear();
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes whose error indicator is set.
    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.has_error())
            .map(|node| node.id())
            .collect()
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Connect an output slot to an input slot.
    ///
    /// Slots may be addressed by index or by name. A name the node does not
    /// currently have is looked up among the slots it offers through
    /// `on_get_outputs`/`on_get_inputs`; an offered slot is only added once
    /// the connection is known to be valid. An existing link on the target
    /// input is replaced.
    pub fn connect(
        &mut self,
        origin: NodeId,
        origin_slot: impl Into<SlotRef>,
        target: NodeId,
        target_slot: impl Into<SlotRef>,
    ) -> GraphResult<LinkId> {
        let (out_candidate, origin_type) =
            self.negotiate(origin, SlotDirection::Output, &origin_slot.into())?;
        let (in_candidate, target_type) =
            self.negotiate(target, SlotDirection::Input, &target_slot.into())?;

        if !origin_type.connects_to(&target_type) {
            return Err(GraphError::SlotTypeMismatch {
                origin,
                origin_type,
                target,
                target_type,
            });
        }

        let id = self
            .last_link_id
            .checked_add(1)
            .map(LinkId::from)
            .ok_or(GraphError::IdsExhausted("link"))?;

        let out_index = self.materialize(origin, SlotDirection::Output, out_candidate);
        let in_index = self.materialize(target, SlotDirection::Input, in_candidate);
        self.create_link(id, origin, out_index, target, in_index)
    }

    /// Remove a link.
    pub fn disconnect(&mut self, id: LinkId) -> GraphResult<Link> {
        let link = self.detach_link(id).ok_or(GraphError::LinkNotFound(id))?;
        tracing::debug!(link = %id, "link removed");
        Ok(link)
    }

    /// Remove whatever link feeds the given input, if any.
    pub fn disconnect_input(&mut self, node: NodeId, slot: impl Into<SlotRef>) -> GraphResult<Option<Link>> {
        let slot = slot.into();
        let target = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let index = target
            .resolve_slot(SlotDirection::Input, &slot)
            .ok_or_else(|| GraphError::SlotNotFound {
                node,
                direction: SlotDirection::Input,
                slot: slot.clone(),
            })?;
        let current = target.inputs()[index].link;
        match current {
            Some(link) => self.disconnect(link).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a link carries data (as opposed to events).
    pub fn is_data_link(&self, link: &Link) -> bool {
        let origin_is_event = self
            .nodes
            .get(&link.origin_id)
            .and_then(|n| n.output(link.origin_slot))
            .map(|slot| slot.slot_type.is_event())
            .unwrap_or(false);
        let target_is_action = self
            .nodes
            .get(&link.target_id)
            .and_then(|n| n.input(link.target_slot))
            .map(|slot| slot.slot_type.is_action())
            .unwrap_or(false);
        !origin_is_event && !target_is_action
    }

    /// Validate and insert a link with a known ID, replacing whatever link
    /// currently feeds the target input.
    pub(crate) fn create_link(
        &mut self,
        id: LinkId,
        origin: NodeId,
        origin_slot: usize,
        target: NodeId,
        target_slot: usize,
    ) -> GraphResult<LinkId> {
        let origin_type = self.slot_type(origin, SlotDirection::Output, origin_slot)?;
        let target_type = self.slot_type(target, SlotDirection::Input, target_slot)?;
        if !origin_type.connects_to(&target_type) {
            return Err(GraphError::SlotTypeMismatch {
                origin,
                origin_type,
                target,
                target_type,
            });
        }

        let previous = self
            .nodes
            .get(&target)
            .and_then(|n| n.input(target_slot))
            .and_then(|slot| slot.link);
        if let Some(previous) = previous {
            self.detach_link(previous);
            tracing::debug!(link = %previous, node = %target, slot = target_slot, "input link replaced");
        }

        let link = Link {
            id,
            origin_id: origin,
            origin_slot,
            target_id: target,
            target_slot,
        };
        if let Some(slot) = self
            .nodes
            .get_mut(&origin)
            .and_then(|n| n.outputs_mut().get_mut(origin_slot))
        {
            slot.links.push(id);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&target)
            .and_then(|n| n.inputs_mut().get_mut(target_slot))
        {
            slot.link = Some(id);
        }
        self.links.insert(id, link);
        self.last_link_id = self.last_link_id.max(id.raw());
        self.touch();

        tracing::debug!(
            link = %id,
            origin = %origin,
            origin_slot,
            target = %target,
            target_slot,
            "link created"
        );
        Ok(id)
    }

    fn detach_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.shift_remove(&id)?;
        if let Some(slot) = self
            .nodes
            .get_mut(&link.origin_id)
            .and_then(|n| n.outputs_mut().get_mut(link.origin_slot))
        {
            slot.remove_link(id);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&link.target_id)
            .and_then(|n| n.inputs_mut().get_mut(link.target_slot))
        {
            if slot.link == Some(id) {
                slot.link = None;
            }
        }
        self.touch();
        Some(link)
    }

    fn slot_type(&self, node: NodeId, direction: SlotDirection, index: usize) -> GraphResult<SlotType> {
        let n = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let ty = match direction {
            SlotDirection::Input => n.input(index).map(|slot| slot.slot_type.clone()),
            SlotDirection::Output => n.output(index).map(|slot| slot.slot_type.clone()),
        };
        ty.ok_or(GraphError::SlotNotFound {
            node,
            direction,
            slot: SlotRef::Index(index),
        })
    }

    fn negotiate(
        &self,
        node_id: NodeId,
        direction: SlotDirection,
        slot: &SlotRef,
    ) -> GraphResult<(Candidate, SlotType)> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if let Some(index) = node.resolve_slot(direction, slot) {
            let ty = self.slot_type(node_id, direction, index)?;
            return Ok((Candidate::Existing(index), ty));
        }

        let not_found = || GraphError::SlotNotFound {
            node: node_id,
            direction,
            slot: slot.clone(),
        };
        let SlotRef::Name(name) = slot else {
            return Err(not_found());
        };

        let offered = node
            .behavior()
            .map(|behavior| match direction {
                SlotDirection::Input => behavior.on_get_inputs(),
                SlotDirection::Output => behavior.on_get_outputs(),
            })
            .unwrap_or_default();

        offered
            .into_iter()
            .find(|descriptor| &descriptor.name == name)
            .map(|descriptor| {
                let ty = descriptor.slot_type.clone();
                (Candidate::Offered(descriptor), ty)
            })
            .ok_or_else(not_found)
    }

    fn materialize(&mut self, node_id: NodeId, direction: SlotDirection, candidate: Candidate) -> usize {
        match candidate {
            Candidate::Existing(index) => index,
            Candidate::Offered(descriptor) => {
                tracing::debug!(node = %node_id, %direction, slot = %descriptor.name, "offered slot materialized");
                match self.nodes.get_mut(&node_id) {
                    Some(node) => match direction {
                        SlotDirection::Input => node.add_input(descriptor),
                        SlotDirection::Output => node.add_output(descriptor),
                    },
                    None => 0,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// The last committed value of a data output.
    pub fn output_value(&self, node: NodeId, slot: usize) -> Option<&Value> {
        self.values.get(&(node, slot))
    }

    /// What an input currently reads: the origin's committed output when
    /// linked, otherwise the node's property of the same name.
    pub fn input_value(&self, node: NodeId, slot: usize) -> Option<&Value> {
        let n = self.nodes.get(&node)?;
        let input = n.input(slot)?;
        match input.link {
            Some(link_id) => {
                let link = self.links.get(&link_id)?;
                self.values.get(&(link.origin_id, link.origin_slot))
            }
            None => n.property(&input.name),
        }
    }

    // ------------------------------------------------------------------
    // Faults
    // ------------------------------------------------------------------

    /// Drain the graph-level fault log.
    pub fn take_faults(&mut self) -> Vec<GraphError> {
        self.faults.drain(..).collect()
    }

    pub fn faults(&self) -> impl Iterator<Item = &GraphError> {
        self.faults.iter()
    }

    pub(crate) fn record_fault(&mut self, fault: GraphError) {
        if self.faults.len() >= self.config.fault_log_capacity {
            self.faults.pop_front();
        }
        self.faults.push_back(fault);
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("version", &self.version)
            .field("clock", &self.clock)
            .field("state", &self.state)
            .finish()
    }
}
