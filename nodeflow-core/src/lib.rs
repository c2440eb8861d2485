//! Nodeflow Core
//!
//! This crate provides the runtime for Nodeflow node graphs: typed nodes
//! connected by typed links, evaluated by a scheduler with two dispatch
//! paths.
//!
//! - **Pull**: each [`Graph::tick`] advances the clock and runs every
//!   pull-mode node once, in data-dependency order.
//! - **Push**: [`Graph::trigger`] fires an output and runs the linked nodes'
//!   action hooks immediately, possibly nested inside a tick.
//!
//! # Architecture
//!
//! - `registry`: node type catalog and shared resources
//! - `behavior`: the trait node types implement
//! - `graph`: nodes, slots, links and structural edits
//! - `scheduler`: execution order, tick, trigger cascades, hook boundary
//! - `document`: JSON and MessagePack persistence
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use nodeflow_core::{Capabilities, Graph, HookResult, NodeBehavior, NodeContext, Registry, Value};
//!
//! struct Double;
//!
//! impl NodeBehavior for Double {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::PULL
//!     }
//!
//!     fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
//!         let x = ctx.input_f64(0).unwrap_or_default();
//!         ctx.set_output(0, x * 2.0)?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.register("math/double", |shape| {
//!     shape.input("x", "number").output("y", "number").property("x", 21.0);
//!     Box::new(Double)
//! });
//!
//! let mut graph = Graph::new(Arc::new(registry));
//! let node = graph.create_node("math/double").unwrap();
//! graph.start();
//! graph.tick(1.0 / 60.0).unwrap();
//!
//! assert_eq!(graph.output_value(node, 0), Some(&Value::from(42.0)));
//! ```

pub mod behavior;
pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod registry;
pub mod scheduler;

pub use serde_json::Value;

pub use behavior::{Capabilities, NodeBehavior};
pub use config::GraphConfig;
pub use document::{GraphDocument, LinkRecord, LoadReport, NodeRecord};
pub use error::{GraphError, GraphResult, Hook, HookResult, NodeError};
pub use graph::{
    Clock, Graph, Link, LinkId, Node, NodeFlags, NodeId, NodeMode, NodeStatus, RunState, SlotDescriptor,
    SlotDirection, SlotRef, SlotType,
};
pub use registry::{NodeShape, NodeType, Registry};
pub use scheduler::{NodeContext, TickReport};
