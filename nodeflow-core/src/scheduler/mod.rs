//! Scheduler
//!
//! Two dispatch paths run over a [`Graph`](crate::graph::Graph):
//!
//! - **Pull**: [`Graph::tick`](crate::graph::Graph::tick) advances the clock
//!   and runs `on_execute` once per pull-mode node, in an order where every
//!   node runs after the nodes feeding its data inputs.
//! - **Push**: [`Graph::trigger`](crate::graph::Graph::trigger) fires an
//!   output and runs `on_action` on every linked target immediately, nesting
//!   as deep as the targets keep firing, up to `max_cascade_depth`.
//!
//! Both paths call node hooks through a single failure boundary (see
//! [`context`]), so one broken node never aborts a tick or a cascade.
//!
//! # Feedback
//!
//! Data cycles are allowed. Within a cycle, nodes run in registration order
//! and read whatever their upstream members committed on the previous tick.

mod cascade;
pub mod context;
mod order;
mod tick;
mod trigger;

pub use context::NodeContext;
pub use order::ExecutionOrder;
pub use tick::TickReport;
