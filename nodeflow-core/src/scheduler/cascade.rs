//! Cascade Tracking
//!
//! Trigger dispatch is synchronous: a node reacting to an action may fire
//! its own outputs, which run further `on_action` hooks before the first
//! call returns. This module bounds how deep that nesting may go.
//!
//! # Implementation
//!
//! A thread-local stack holds one frame per trigger currently being
//! dispatched. [`CascadeScope::enter`] pushes a frame, or refuses with
//! [`GraphError::CascadeDepthExceeded`] once the stack is full, and the
//! returned guard pops it on drop. Unwinding out of a panicking hook drops
//! the guards as well, so the stack stays balanced.

use std::cell::RefCell;

use crate::error::{GraphError, GraphResult};
use crate::graph::NodeId;

thread_local! {
    static CASCADE_STACK: RefCell<Vec<CascadeFrame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy)]
struct CascadeFrame {
    /// Node whose output is being fired.
    node: NodeId,
    slot: usize,
}

/// Guard for one level of trigger dispatch.
pub(crate) struct CascadeScope {
    node: NodeId,
    slot: usize,
}

impl CascadeScope {
    /// Enter one more level of dispatch for `node`'s output `slot`.
    pub(crate) fn enter(node: NodeId, slot: usize, limit: usize) -> GraphResult<Self> {
        CASCADE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.len() >= limit {
                return Err(GraphError::CascadeDepthExceeded { node, limit });
            }
            stack.push(CascadeFrame { node, slot });
            Ok(())
        })?;

        Ok(Self { node, slot })
    }

    /// Number of dispatches in progress on this thread.
    pub(crate) fn depth() -> usize {
        CASCADE_STACK.with(|stack| stack.borrow().len())
    }

    /// Origins of the dispatches in progress, outermost first.
    pub(crate) fn path() -> Vec<NodeId> {
        CASCADE_STACK.with(|stack| stack.borrow().iter().map(|frame| frame.node).collect())
    }
}

impl Drop for CascadeScope {
    fn drop(&mut self) {
        CASCADE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert!(
                    frame.node == self.node && frame.slot == self.slot,
                    "CascadeScope mismatch: expected {}:{}, got {}:{}",
                    self.node,
                    self.slot,
                    frame.node,
                    frame.slot
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_nest_and_unwind() {
        let a = NodeId::from(1);
        let b = NodeId::from(2);
        assert_eq!(CascadeScope::depth(), 0);

        {
            let _outer = CascadeScope::enter(a, 0, 8).unwrap();
            {
                let _inner = CascadeScope::enter(b, 1, 8).unwrap();
                assert_eq!(CascadeScope::depth(), 2);
                assert_eq!(CascadeScope::path(), vec![a, b]);
            }
            assert_eq!(CascadeScope::path(), vec![a]);
        }

        assert_eq!(CascadeScope::depth(), 0);
    }

    #[test]
    fn refuses_beyond_limit() {
        let node = NodeId::from(7);
        let _first = CascadeScope::enter(node, 0, 2).unwrap();
        let _second = CascadeScope::enter(node, 0, 2).unwrap();

        let err = CascadeScope::enter(node, 0, 2).err();
        assert_eq!(err, Some(GraphError::CascadeDepthExceeded { node, limit: 2 }));
        // a refused entry pushes nothing
        assert_eq!(CascadeScope::depth(), 2);
    }

    #[test]
    fn panic_unwinding_pops_frames() {
        let result = std::panic::catch_unwind(|| {
            let _scope = CascadeScope::enter(NodeId::from(3), 0, 4).unwrap();
            panic!("hook blew up");
        });
        assert!(result.is_err());
        assert_eq!(CascadeScope::depth(), 0);
    }
}
