//! Execution Order
//!
//! Computes the order the pull pass visits nodes in.
//!
//! # Algorithm
//!
//! Only data links constrain the order; event links never do.
//!
//! 1. Group nodes into strongly connected components over data links
//!    (Kosaraju, iterative). A component with more than one node, or a node
//!    linked to itself, is a feedback cycle.
//! 2. Run Kahn's algorithm over the components. When several components are
//!    ready at once, the one holding the earliest-registered node goes first.
//! 3. Emit each component's nodes in registration order.
//!
//! For an acyclic data graph this is a topological order that falls back to
//! registration order wherever dependencies do not decide. Nodes inside a
//! cycle run in registration order, and whichever of them runs first reads
//! the other members' values from the previous tick. Nodes downstream of a
//! cycle still run after all of it.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use smallvec::SmallVec;

use crate::graph::{Graph, NodeId};

type Edges = Vec<SmallVec<[usize; 4]>>;

/// Cached pull-pass order, tagged with the graph version it was computed
/// for.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOrder {
    version: Option<u64>,
    nodes: Vec<NodeId>,
}

impl ExecutionOrder {
    pub fn is_current(&self, version: u64) -> bool {
        self.version == Some(version)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

impl Graph {
    /// The order the next tick will visit nodes in. Recomputed only when
    /// the graph version has changed since the last call.
    pub fn execution_order(&mut self) -> &[NodeId] {
        if !self.order.is_current(self.version) {
            let nodes = compute(self);
            tracing::debug!(version = self.version, nodes = nodes.len(), "execution order recomputed");
            self.order = ExecutionOrder {
                version: Some(self.version),
                nodes,
            };
        }
        self.order.nodes()
    }
}

/// Compute a fresh order for the graph's current topology.
pub(crate) fn compute(graph: &Graph) -> Vec<NodeId> {
    let ids: Vec<NodeId> = graph.nodes.keys().copied().collect();
    let position: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let n = ids.len();

    let mut forward: Edges = vec![SmallVec::new(); n];
    let mut reverse: Edges = vec![SmallVec::new(); n];
    for link in graph.links.values().filter(|link| graph.is_data_link(link)) {
        if let (Some(&from), Some(&to)) = (position.get(&link.origin_id), position.get(&link.target_id)) {
            forward[from].push(to);
            reverse[to].push(from);
        }
    }

    let component = strongly_connected(&forward, &reverse);
    let component_count = component.iter().copied().max().map_or(0, |c| c + 1);

    // Members ascend by registration index because we fill them in order.
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); component_count];
    for (node, &c) in component.iter().enumerate() {
        members[c].push(node);
    }

    let mut in_degree = vec![0usize; component_count];
    let mut dependents: Edges = vec![SmallVec::new(); component_count];
    for (from, targets) in forward.iter().enumerate() {
        for &to in targets {
            let (cf, ct) = (component[from], component[to]);
            if cf != ct {
                dependents[cf].push(ct);
                in_degree[ct] += 1;
            }
        }
    }

    // Keyed by each component's earliest member so ties resolve by
    // registration order.
    let mut ready: BinaryHeap<Reverse<usize>> = (0..component_count)
        .filter(|&c| in_degree[c] == 0)
        .map(|c| Reverse(members[c][0]))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(first)) = ready.pop() {
        let c = component[first];
        order.extend(members[c].iter().map(|&node| ids[node]));
        for &next in &dependents[c] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(members[next][0]));
            }
        }
    }

    order
}

/// Label every node with its strongly connected component.
fn strongly_connected(forward: &Edges, reverse: &Edges) -> Vec<usize> {
    let n = forward.len();

    // First pass: finish order on the forward graph.
    let mut visited = vec![false; n];
    let mut finished = Vec::with_capacity(n);
    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if top.1 < forward[node].len() {
                let next = forward[node][top.1];
                top.1 += 1;
                if !visited[next] {
                    visited[next] = true;
                    stack.push((next, 0));
                }
            } else {
                finished.push(node);
                stack.pop();
            }
        }
    }

    // Second pass: collect components on the reverse graph.
    let mut component = vec![usize::MAX; n];
    let mut count = 0;
    for &start in finished.iter().rev() {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = count;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &prev in &reverse[node] {
                if component[prev] == usize::MAX {
                    component[prev] = count;
                    stack.push(prev);
                }
            }
        }
        count += 1;
    }

    component
}
