//! Pull pass and run state transitions.

use serde::Serialize;

use crate::error::{GraphError, GraphResult, Hook};
use crate::graph::{Graph, NodeId, NodeStatus, RunState};

/// Outcome of one call to [`Graph::tick`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Clock iteration after the tick.
    pub iteration: u64,
    /// Nodes whose `on_execute` returned `Ok`.
    pub executed: usize,
    /// Nodes whose `on_execute` failed, in execution order.
    pub failed: Vec<NodeId>,
    /// Set when the graph was not running and nothing happened.
    pub idle: bool,
}

impl TickReport {
    fn idle(iteration: u64) -> Self {
        Self {
            iteration,
            idle: true,
            ..Self::default()
        }
    }
}

impl Graph {
    /// Advance the clock by `dt` seconds and run `on_execute` on every
    /// pull-mode node in execution order.
    ///
    /// A graph that is stopped or paused does nothing and reports an idle
    /// tick; its clock does not move. Node failures are contained and show
    /// up in the report, the node's error indicator and the fault log.
    pub fn tick(&mut self, dt: f64) -> GraphResult<TickReport> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(GraphError::InvalidTimeStep(dt));
        }
        if self.state != RunState::Running {
            tracing::trace!(state = ?self.state, "tick skipped, graph not running");
            return Ok(TickReport::idle(self.clock.iteration));
        }

        self.clock.advance(dt);
        let iteration = self.clock.iteration;
        let _span = tracing::debug_span!("tick", iteration, dt).entered();

        let order = self.execution_order().to_vec();
        let mut report = TickReport {
            iteration,
            ..TickReport::default()
        };
        for id in order {
            let runs = self.nodes.get(&id).is_some_and(|node| node.runs_in_pull_pass());
            if !runs {
                continue;
            }
            match self.lifecycle(id, Hook::Execute) {
                Ok(()) => report.executed += 1,
                Err(_) => report.failed.push(id),
            }
        }

        if !report.failed.is_empty() {
            tracing::debug!(failed = report.failed.len(), executed = report.executed, "tick finished with failures");
        }
        Ok(report)
    }

    /// Start running. Calls `on_start` on every node in registration order.
    /// Does nothing unless the graph is stopped.
    pub fn start(&mut self) {
        if self.state != RunState::Stopped {
            tracing::debug!(state = ?self.state, "start ignored");
            return;
        }
        self.state = RunState::Running;
        self.transition(Hook::Start, NodeStatus::Started);
        tracing::info!(nodes = self.nodes.len(), "graph started");
    }

    /// Stop running. Calls `on_stop` on every node. Works from the running
    /// or paused state.
    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.state = RunState::Stopped;
        self.transition(Hook::Stop, NodeStatus::Added);
        tracing::info!(iteration = self.clock.iteration, "graph stopped");
    }

    /// Suspend ticking without stopping. Calls `on_pause` on every node.
    pub fn pause(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        self.state = RunState::Paused;
        self.transition(Hook::Pause, NodeStatus::Paused);
        tracing::info!("graph paused");
    }

    /// Resume a paused graph. Calls `on_unpause` on every node.
    pub fn unpause(&mut self) {
        if self.state != RunState::Paused {
            return;
        }
        self.state = RunState::Running;
        self.transition(Hook::Unpause, NodeStatus::Started);
        tracing::info!("graph resumed");
    }

    fn transition(&mut self, hook: Hook, status: NodeStatus) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let _ = self.lifecycle(id, hook);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.set_status(status);
            }
        }
    }
}
