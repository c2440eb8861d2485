//! Integration Tests for the Pull Pass
//!
//! These tests drive whole graphs through `tick` and check ordering, value
//! propagation, feedback cycles and failure containment.

mod common;

use nodeflow_core::{Graph, GraphError, Hook, LinkId, NodeId, RunState, Value};

use common::{init_tracing, journaled_registry, shared_registry};

/// Tiny deterministic generator so topology tests need no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn position(order: &[NodeId], id: NodeId) -> usize {
    order.iter().position(|&n| n == id).unwrap()
}

/// Build a random acyclic graph of `add_one` nodes where later-registered
/// nodes frequently feed earlier ones.
fn random_dag(graph: &mut Graph, seed: u64, count: usize) -> Vec<NodeId> {
    let mut rng = Lcg(seed);
    let ids: Vec<NodeId> = (0..count)
        .map(|_| graph.create_node("math/add_one").unwrap())
        .collect();
    // a hidden rank decides the dependency direction, unrelated to
    // registration order
    let mut rank: Vec<usize> = (0..count).collect();
    for i in (1..count).rev() {
        let j = rng.next(i + 1);
        rank.swap(i, j);
    }
    for target in 0..count {
        for slot in 0..2 {
            if rng.next(3) == 0 {
                continue;
            }
            let origin = rng.next(count);
            if rank[origin] < rank[target] {
                graph.connect(ids[origin], 0, ids[target], slot).unwrap();
            }
        }
    }
    ids
}

/// Scenario: a constant of 5 feeding a multiply-by-2 node yields 10 after
/// one tick.
#[test]
fn constant_feeds_multiplier() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    // registered target first so only the dependency order can get it right
    let multiply = graph.create_node("math/scale").unwrap();
    let constant = graph.create_node("basic/const").unwrap();
    graph.connect(constant, "value", multiply, "in").unwrap();

    graph.start();
    let report = graph.tick(0.016).unwrap();

    assert_eq!(report.executed, 2);
    assert!(report.failed.is_empty());
    assert_eq!(graph.output_value(multiply, 0).and_then(Value::as_f64), Some(10.0));
}

#[test]
fn every_data_link_runs_origin_first() {
    init_tracing();
    let (registry, journal) = journaled_registry();
    let mut graph = Graph::new(registry);
    random_dag(&mut graph, 7, 40);
    graph.start();

    for _ in 0..3 {
        journal.lock().clear();
        graph.tick(0.1).unwrap();
        let executed = journal.lock().clone();
        assert_eq!(executed.len(), 40);
        for link in graph.links() {
            assert!(
                position(&executed, link.origin_id) < position(&executed, link.target_id),
                "link {} ran out of order",
                link.id
            );
        }
    }
}

#[test]
fn outputs_reflect_upstream_values_of_the_same_tick() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let ids = random_dag(&mut graph, 99, 25);
    graph.start();
    graph.tick(0.1).unwrap();

    for &id in &ids {
        let node = graph.node(id).unwrap();
        let upstream: f64 = (0..node.inputs().len())
            .filter_map(|slot| graph.input_value(id, slot))
            .filter_map(Value::as_f64)
            .sum();
        assert_eq!(graph.output_value(id, 0).and_then(Value::as_f64), Some(upstream + 1.0));
    }
}

#[test]
fn order_tracks_rewiring() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let a = graph.create_node("basic/pass").unwrap();
    let b = graph.create_node("basic/pass").unwrap();
    let link = graph.connect(b, 0, a, 0).unwrap();
    assert_eq!(graph.execution_order(), &[b, a]);

    graph.disconnect(link).unwrap();
    graph.connect(a, 0, b, 0).unwrap();
    assert_eq!(graph.execution_order(), &[a, b]);
}

/// Scenario: an accumulator fed back through a pass-through node counts
/// 1, 2, 3 over three ticks.
#[test]
fn feedback_cycle_reads_previous_tick() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let accumulate = graph.create_node("math/accumulate").unwrap();
    let pass = graph.create_node("basic/pass").unwrap();
    graph.connect(accumulate, 0, pass, 0).unwrap();
    graph.connect(pass, 0, accumulate, 0).unwrap();
    graph.start();

    let mut observed = Vec::new();
    for _ in 0..3 {
        graph.tick(0.1).unwrap();
        observed.push(graph.output_value(accumulate, 0).and_then(Value::as_f64).unwrap());
    }
    assert_eq!(observed, vec![1.0, 2.0, 3.0]);
}

/// Scenario: a node dividing by zero fails without disturbing its sibling.
#[test]
fn failing_node_keeps_previous_output_and_sibling_runs() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let source = graph.create_node("basic/const").unwrap();
    let divide = graph.create_node("math/divide").unwrap();
    let sibling = graph.create_node("math/scale").unwrap();
    graph.connect(source, 0, divide, 0).unwrap();
    graph.connect(source, 0, sibling, 0).unwrap();
    graph.start();

    graph.tick(0.1).unwrap();
    assert_eq!(graph.output_value(divide, 0).and_then(Value::as_f64), Some(5.0));

    graph.node_mut(divide).unwrap().set_property("divisor", 0);
    graph.node_mut(source).unwrap().set_property("value", 7);
    let report = graph.tick(0.1).unwrap();

    assert_eq!(report.failed, vec![divide]);
    assert_eq!(report.executed, 2);
    assert_eq!(graph.output_value(divide, 0).and_then(Value::as_f64), Some(5.0));
    assert_eq!(graph.output_value(sibling, 0).and_then(Value::as_f64), Some(14.0));
    assert_eq!(graph.failed_nodes(), vec![divide]);

    let faults = graph.take_faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(
        &faults[0],
        GraphError::NodeExecution { node, hook: Hook::Execute, message }
            if *node == divide && message.contains("division by zero")
    ));

    graph.node_mut(divide).unwrap().set_property("divisor", 7);
    graph.tick(0.1).unwrap();
    assert!(graph.failed_nodes().is_empty());
    assert_eq!(graph.output_value(divide, 0).and_then(Value::as_f64), Some(1.0));
}

#[test]
fn missing_input_is_contained() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let orphan = graph.create_node("math/scale").unwrap();
    let constant = graph.create_node("basic/const").unwrap();
    graph.start();

    let report = graph.tick(0.1).unwrap();

    assert_eq!(report.failed, vec![orphan]);
    assert_eq!(graph.output_value(constant, 0), Some(&Value::from(5)));
}

/// Scenario: a second link into an occupied input evicts the first.
#[test]
fn reconnecting_input_evicts_previous_link() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let first = graph.create_node("basic/const").unwrap();
    let second = graph.create_node("basic/const").unwrap();
    let target = graph.create_node("math/scale").unwrap();

    let old = graph.connect(first, 0, target, 0).unwrap();
    let new = graph.connect(second, 0, target, 0).unwrap();

    let ids: Vec<LinkId> = graph.links().map(|link| link.id).collect();
    assert_eq!(ids, vec![new]);
    assert!(!ids.contains(&old));
}

#[test]
fn removal_leaves_no_dangling_links() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let ids = random_dag(&mut graph, 3, 20);
    graph.start();

    for &victim in ids.iter().step_by(3) {
        graph.remove(victim).unwrap();
        for link in graph.links() {
            let origin = graph.node(link.origin_id).expect("origin exists");
            let target = graph.node(link.target_id).expect("target exists");
            assert!(origin.outputs()[link.origin_slot].links.contains(&link.id));
            assert_eq!(target.inputs()[link.target_slot].link, Some(link.id));
        }
        for node in graph.nodes() {
            for input in node.inputs() {
                if let Some(link) = input.link {
                    assert!(graph.link(link).is_some());
                }
            }
        }
    }

    // the survivors still tick cleanly
    assert!(graph.tick(0.1).unwrap().failed.is_empty());
}

#[test]
fn stopped_graph_does_not_tick() {
    init_tracing();
    let mut graph = Graph::new(shared_registry());
    let constant = graph.create_node("basic/const").unwrap();

    assert!(graph.tick(0.1).unwrap().idle);
    assert_eq!(graph.output_value(constant, 0), None);

    graph.start();
    graph.pause();
    assert_eq!(graph.state(), RunState::Paused);
    assert!(graph.tick(0.1).unwrap().idle);
    assert_eq!(graph.clock().global_time, 0.0);
}
