//! Push dispatch: firing an output runs the `on_action` hook of every node
//! linked to it, depth first, before returning.

use smallvec::SmallVec;

use super::cascade::CascadeScope;
use crate::error::{GraphError, GraphResult, Hook};
use crate::graph::{Graph, NodeId, SlotDirection, SlotRef};
use crate::Value;

impl Graph {
    /// Fire output `slot` of `node` with `param`.
    ///
    /// Targets are visited in the order their links were created. A target
    /// in `Never` mode, or whose type does not react to actions, is skipped.
    /// A failing target is recorded and the remaining targets still run.
    ///
    /// A cascade that loops back to a node still inside one of its own hooks
    /// is not delivered: that target is refused with `ReentrantHook`, logged
    /// to the fault log, and the remaining targets still run. Loops through
    /// nodes that have already returned are bounded by `max_cascade_depth`.
    ///
    /// Returns how many targets ran their `on_action` successfully. Fails
    /// only when the output cannot be resolved or the cascade is already at
    /// `max_cascade_depth`.
    pub fn trigger(&mut self, node: NodeId, slot: impl Into<SlotRef>, param: impl Into<Value>) -> GraphResult<usize> {
        let slot = slot.into();
        let param = param.into();

        let origin = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let index = origin
            .resolve_slot(SlotDirection::Output, &slot)
            .ok_or(GraphError::SlotNotFound {
                node,
                direction: SlotDirection::Output,
                slot,
            })?;
        let targets: SmallVec<[(NodeId, usize); 4]> = origin.outputs()[index]
            .links
            .iter()
            .filter_map(|link| self.links.get(link))
            .map(|link| (link.target_id, link.target_slot))
            .collect();

        let limit = self.config.max_cascade_depth;
        let _scope = match CascadeScope::enter(node, index, limit) {
            Ok(scope) => scope,
            Err(err) => {
                tracing::warn!(node = %node, slot = index, path = ?CascadeScope::path(), "trigger cascade too deep");
                self.record_fault(err.clone());
                return Err(err);
            }
        };
        let _span = tracing::trace_span!("trigger", node = %node, slot = index, depth = CascadeScope::depth()).entered();

        let mut delivered = 0;
        for (target, input) in targets {
            // Failures are logged and recorded at the hook boundary.
            if let Ok(true) = self.deliver(target, input, &param) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Run `target`'s `on_action` for input `input`. `Ok(false)` when the
    /// target does not take actions.
    fn deliver(&mut self, target: NodeId, input: usize, param: &Value) -> GraphResult<bool> {
        let node = self.nodes.get(&target).ok_or(GraphError::NodeNotFound(target))?;
        if !node.accepts_actions() {
            tracing::trace!(node = %target, mode = ?node.mode, "target does not take actions");
            return Ok(false);
        }
        let name = node
            .input(input)
            .map(|slot| slot.name.clone())
            .ok_or(GraphError::SlotNotFound {
                node: target,
                direction: SlotDirection::Input,
                slot: SlotRef::Index(input),
            })?;

        self.invoke_hook(target, Hook::Action, |behavior, ctx| behavior.on_action(ctx, &name, param))?;
        Ok(true)
    }
}
