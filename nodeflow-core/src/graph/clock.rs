//! Graph clock and run state.

use serde::{Deserialize, Serialize};

/// Time as seen by nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Clock {
    /// The current tick's `dt`, in seconds.
    pub elapsed_time: f64,
    /// Sum of every `dt` since the graph was created. Never decreases.
    pub global_time: f64,
    /// Number of ticks run.
    pub iteration: u64,
}

impl Clock {
    pub(crate) fn advance(&mut self, dt: f64) {
        self.elapsed_time = dt;
        self.global_time += dt;
        self.iteration += 1;
    }
}

/// Whether the graph is ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
    Paused,
}
