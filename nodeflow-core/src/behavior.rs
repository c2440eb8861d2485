//! Node Behavior
//!
//! The contract every registered node type implements. All hooks are
//! optional and default to no-ops; the only required method is
//! [`NodeBehavior::capabilities`], which the registry reads once per type to
//! decide whether the scheduler should ever call `on_execute` or `on_action`.
//!
//! Hooks receive a [`NodeContext`] scoped to their own node. Output writes
//! made through the context are staged and only become visible downstream
//! once the hook returns `Ok`.

use crate::document::NodeRecord;
use crate::error::HookResult;
use crate::graph::SlotDescriptor;
use crate::scheduler::NodeContext;
use crate::Value;

/// Which dispatch paths a node type takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Run `on_execute` during ticks.
    pub execute: bool,
    /// Deliver triggers to `on_action`.
    pub action: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities { execute: false, action: false };
    pub const PULL: Capabilities = Capabilities { execute: true, action: false };
    pub const PUSH: Capabilities = Capabilities { execute: false, action: true };
    pub const BOTH: Capabilities = Capabilities { execute: true, action: true };
}

/// Behavior attached to a node instance.
pub trait NodeBehavior: 'static {
    /// Dispatch paths this type uses. Read once at registration.
    fn capabilities(&self) -> Capabilities;

    /// Per-tick evaluation for pull-mode nodes.
    fn on_execute(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    /// Reaction to a trigger arriving on the named input.
    fn on_action(&mut self, _ctx: &mut NodeContext<'_>, _input: &str, _param: &Value) -> HookResult {
        Ok(())
    }

    fn on_added(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    /// Release anything acquired in `on_start`.
    fn on_stop(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_pause(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_unpause(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    /// Release external resources before the node leaves the graph.
    fn on_removed(&mut self, _ctx: &mut NodeContext<'_>) -> HookResult {
        Ok(())
    }

    /// Adjust the record about to be persisted. Nodes may drop properties or
    /// add entries to `record.extra`.
    fn on_serialize(&self, _record: &mut NodeRecord) {}

    /// Rebuild derived state from a loaded record. Runs after properties and
    /// links have been restored.
    fn on_configure(&mut self, _ctx: &mut NodeContext<'_>, _record: &NodeRecord) -> HookResult {
        Ok(())
    }

    /// Extra input slots this node can materialize on demand when a link
    /// asks for them by name.
    fn on_get_inputs(&self) -> Vec<SlotDescriptor> {
        Vec::new()
    }

    /// Extra output slots this node can materialize on demand.
    fn on_get_outputs(&self) -> Vec<SlotDescriptor> {
        Vec::new()
    }
}
