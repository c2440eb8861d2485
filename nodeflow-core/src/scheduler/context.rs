//! Node Context
//!
//! Every hook runs through [`Graph::invoke_hook`], which
//!
//! 1. takes the behavior out of its node, so a cascade that loops back to a
//!    node still inside one of its hooks is refused with `ReentrantHook`
//!    instead of aliasing it;
//! 2. hands the behavior a [`NodeContext`] scoped to that node;
//! 3. contains failures: an `Err` or a caught panic sets the node's error
//!    indicator, lands in the fault log and discards the hook's staged
//!    outputs;
//! 4. on success commits the staged outputs to the graph's value table.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::behavior::NodeBehavior;
use crate::error::{GraphError, GraphResult, Hook, HookResult};
use crate::graph::{Clock, Graph, Node, NodeId, SlotDirection, SlotRef};
use crate::Value;

/// A node's view of the graph while one of its hooks runs.
pub struct NodeContext<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    staged: SmallVec<[(usize, Value); 4]>,
}

impl<'g> NodeContext<'g> {
    pub(crate) fn new(graph: &'g mut Graph, node: NodeId) -> Self {
        Self {
            graph,
            node,
            staged: SmallVec::new(),
        }
    }

    fn this(&self) -> Option<&Node> {
        self.graph.nodes.get(&self.node)
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn clock(&self) -> Clock {
        self.graph.clock
    }

    /// The current tick's `dt`.
    pub fn elapsed_time(&self) -> f64 {
        self.graph.clock.elapsed_time
    }

    pub fn global_time(&self) -> f64 {
        self.graph.clock.global_time
    }

    pub fn input_count(&self) -> usize {
        self.this().map_or(0, |node| node.inputs().len())
    }

    pub fn output_count(&self) -> usize {
        self.this().map_or(0, |node| node.outputs().len())
    }

    /// What input `slot` reads right now: the origin's last committed value
    /// when linked, otherwise the same-named property.
    pub fn input(&self, slot: usize) -> Option<&Value> {
        self.graph.input_value(self.node, slot)
    }

    pub fn input_by_name(&self, name: &str) -> Option<&Value> {
        let slot = self.this()?.find_input(name)?;
        self.input(slot)
    }

    pub fn input_f64(&self, slot: usize) -> Option<f64> {
        self.input(slot).and_then(Value::as_f64)
    }

    pub fn is_input_connected(&self, slot: usize) -> bool {
        self.this()
            .and_then(|node| node.input(slot))
            .is_some_and(|input| input.is_connected())
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.this()?.property(name)
    }

    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.property(name).and_then(Value::as_f64)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(node) = self.graph.nodes.get_mut(&self.node) {
            node.set_property(name, value);
        }
    }

    /// Stage a value for output `slot`. The last write to a slot wins; the
    /// value is committed when the hook returns `Ok` and thrown away
    /// otherwise.
    pub fn set_output(&mut self, slot: usize, value: impl Into<Value>) -> GraphResult<()> {
        let output = self
            .this()
            .and_then(|node| node.output(slot))
            .ok_or(GraphError::SlotNotFound {
                node: self.node,
                direction: SlotDirection::Output,
                slot: SlotRef::Index(slot),
            })?;
        if output.slot_type.is_event() {
            return Err(GraphError::EventSlotValue { node: self.node, slot });
        }

        let value = value.into();
        match self.staged.iter_mut().find(|(staged, _)| *staged == slot) {
            Some(entry) => entry.1 = value,
            None => self.staged.push((slot, value)),
        }
        Ok(())
    }

    /// Fire one of this node's outputs. Every linked target's `on_action`
    /// runs before this returns. Returns how many targets accepted the
    /// event.
    ///
    /// This node is inside a hook for the whole cascade, so an event that
    /// loops back to it is refused with `ReentrantHook`. See
    /// [`Graph::trigger`].
    pub fn trigger(&mut self, slot: impl Into<SlotRef>, param: impl Into<Value>) -> GraphResult<usize> {
        self.graph.trigger(self.node, slot, param)
    }

    /// A resource shared through the registry.
    pub fn resource<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.graph.registry.resource::<T>(name)
    }

    fn into_staged(self) -> SmallVec<[(usize, Value); 4]> {
        self.staged
    }
}

impl Graph {
    /// Run one hook of one node behind the failure boundary.
    pub(crate) fn invoke_hook<F>(&mut self, id: NodeId, hook: Hook, call: F) -> GraphResult<()>
    where
        F: FnOnce(&mut dyn NodeBehavior, &mut NodeContext<'_>) -> HookResult,
    {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        let Some(mut behavior) = node.take_behavior() else {
            let err = GraphError::ReentrantHook(id);
            tracing::warn!(node = %id, %hook, "hook re-entered, call refused");
            self.record_fault(err.clone());
            return Err(err);
        };

        let catch_panics = self.config.catch_panics;
        let (outcome, staged) = {
            let mut ctx = NodeContext::new(self, id);
            let outcome = if catch_panics {
                match panic::catch_unwind(AssertUnwindSafe(|| call(behavior.as_mut(), &mut ctx))) {
                    Ok(result) => result.map_err(|err| err.to_string()),
                    Err(payload) => Err(panic_message(&*payload)),
                }
            } else {
                call(behavior.as_mut(), &mut ctx).map_err(|err| err.to_string())
            };
            (outcome, ctx.into_staged())
        };

        if let Some(node) = self.nodes.get_mut(&id) {
            node.restore_behavior(behavior);
        }

        match outcome {
            Ok(()) => {
                for (slot, value) in staged {
                    self.values.insert((id, slot), value);
                }
                if hook == Hook::Execute {
                    if let Some(node) = self.nodes.get_mut(&id) {
                        node.set_error(None);
                    }
                }
                Ok(())
            }
            Err(message) => {
                let err = GraphError::NodeExecution {
                    node: id,
                    hook,
                    message,
                };
                tracing::warn!(node = %id, %hook, error = %err, "node hook failed");
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.set_error(Some(err.clone()));
                }
                self.record_fault(err.clone());
                Err(err)
            }
        }
    }

    /// Run a lifecycle hook, one that takes no arguments beyond the context.
    pub(crate) fn lifecycle(&mut self, id: NodeId, hook: Hook) -> GraphResult<()> {
        self.invoke_hook(id, hook, |behavior, ctx| match hook {
            Hook::Execute => behavior.on_execute(ctx),
            Hook::Added => behavior.on_added(ctx),
            Hook::Start => behavior.on_start(ctx),
            Hook::Stop => behavior.on_stop(ctx),
            Hook::Pause => behavior.on_pause(ctx),
            Hook::Unpause => behavior.on_unpause(ctx),
            Hook::Removed => behavior.on_removed(ctx),
            // These carry arguments and are dispatched by their callers.
            Hook::Action | Hook::Configure => Ok(()),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
