//! Node types and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use nodeflow_core::{Capabilities, Hook, HookResult, NodeBehavior, NodeContext, NodeError, NodeId, Registry, Value};
use parking_lot::Mutex;

/// Execution journal shared through the registry.
pub type Journal = Mutex<Vec<NodeId>>;

pub const JOURNAL: &str = "journal";

/// Lifecycle hooks seen, in call order.
pub type HookJournal = Mutex<Vec<(NodeId, Hook)>>;

pub const HOOK_JOURNAL: &str = "hook_journal";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn note_execution(ctx: &NodeContext<'_>) {
    if let Some(journal) = ctx.resource::<Journal>(JOURNAL) {
        journal.lock().push(ctx.node_id());
    }
}

/// Writes its `value` property every tick.
struct Constant;

impl NodeBehavior for Constant {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        let value = ctx.property("value").cloned().unwrap_or(Value::Null);
        ctx.set_output(0, value)?;
        Ok(())
    }
}

/// `out = in * factor`
struct Scale;

impl NodeBehavior for Scale {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        let input = ctx.input_f64(0).ok_or_else(|| NodeError::MissingInput("in".into()))?;
        let factor = ctx.property_f64("factor").unwrap_or(1.0);
        ctx.set_output(0, input * factor)?;
        Ok(())
    }
}

/// `out = in / divisor`, refusing a zero divisor.
struct Divide;

impl NodeBehavior for Divide {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        let input = ctx.input_f64(0).unwrap_or_default();
        let divisor = ctx.property_f64("divisor").unwrap_or_default();
        if divisor == 0.0 {
            return Err(NodeError::InvalidProperty {
                name: "divisor".into(),
                reason: "division by zero".into(),
            });
        }
        ctx.set_output(0, input / divisor)?;
        Ok(())
    }
}

/// `out = a + b + 1`, missing inputs read as zero.
struct AddOne;

impl NodeBehavior for AddOne {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        let sum = ctx.input_f64(0).unwrap_or_default() + ctx.input_f64(1).unwrap_or_default();
        ctx.set_output(0, sum + 1.0)?;
        Ok(())
    }
}

/// Forwards whatever it reads.
struct Pass;

impl NodeBehavior for Pass {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        if let Some(value) = ctx.input(0).cloned() {
            ctx.set_output(0, value)?;
        }
        Ok(())
    }
}

/// `out = in + increment`.
struct Accumulate;

impl NodeBehavior for Accumulate {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        note_execution(ctx);
        let previous = ctx.input_f64(0).unwrap_or_default();
        let increment = ctx.property_f64("increment").unwrap_or(1.0);
        ctx.set_output(0, previous + increment)?;
        Ok(())
    }
}

/// Has an event output the host fires.
struct Button;

impl NodeBehavior for Button {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }
}

/// Counts `inc` actions, resets on `reset`, fires `changed` after each.
struct Counter {
    count: i64,
}

impl NodeBehavior for Counter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PUSH
    }

    fn on_action(&mut self, ctx: &mut NodeContext<'_>, input: &str, _param: &Value) -> HookResult {
        match input {
            "inc" => self.count += 1,
            "reset" => self.count = 0,
            other => return Err(NodeError::msg(format!("unexpected action '{other}'"))),
        }
        ctx.set_property("count", self.count);
        ctx.set_output(0, self.count)?;
        ctx.trigger("changed", self.count)?;
        Ok(())
    }
}

/// Fires `tick` every `interval` seconds of graph time.
struct Timer {
    remaining: f64,
}

impl NodeBehavior for Timer {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PULL
    }

    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        self.remaining = ctx.property_f64("interval").unwrap_or(1.0);
        Ok(())
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        self.remaining -= ctx.elapsed_time();
        if self.remaining <= 0.0 {
            self.remaining += ctx.property_f64("interval").unwrap_or(1.0);
            let now = ctx.global_time();
            ctx.trigger(0, now)?;
        }
        Ok(())
    }
}

/// Counts received actions in its `received` property and forwards them.
struct Echo;

impl NodeBehavior for Echo {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PUSH
    }

    fn on_action(&mut self, ctx: &mut NodeContext<'_>, _input: &str, param: &Value) -> HookResult {
        let received = ctx.property("received").and_then(Value::as_i64).unwrap_or_default();
        ctx.set_property("received", received + 1);
        ctx.trigger(0, param.clone())?;
        Ok(())
    }
}

/// Notes every lifecycle hook, failing the one named by its `fail_on`
/// property.
struct Lifecycle;

impl Lifecycle {
    fn note(ctx: &NodeContext<'_>, hook: Hook) -> HookResult {
        if let Some(journal) = ctx.resource::<HookJournal>(HOOK_JOURNAL) {
            journal.lock().push((ctx.node_id(), hook));
        }
        match ctx.property("fail_on").and_then(Value::as_str) {
            Some(name) if name == hook.to_string() => Err(NodeError::msg("resource release failed")),
            _ => Ok(()),
        }
    }
}

impl NodeBehavior for Lifecycle {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn on_added(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Added)
    }

    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Start)
    }

    fn on_stop(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Stop)
    }

    fn on_pause(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Pause)
    }

    fn on_unpause(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Unpause)
    }

    fn on_removed(&mut self, ctx: &mut NodeContext<'_>) -> HookResult {
        Self::note(ctx, Hook::Removed)
    }
}

pub fn registry() -> Registry {
    let registry = Registry::new();
    registry.register("basic/const", |shape| {
        shape.output("value", "number").property("value", 5);
        Box::new(Constant)
    });
    registry.register("math/scale", |shape| {
        shape
            .input("in", "number")
            .output("out", "number")
            .property("factor", 2);
        Box::new(Scale)
    });
    registry.register("math/divide", |shape| {
        shape
            .input("in", "number")
            .output("out", "number")
            .property("divisor", 1);
        Box::new(Divide)
    });
    registry.register("math/add_one", |shape| {
        shape
            .input("a", "number")
            .input("b", "number")
            .output("sum", "number");
        Box::new(AddOne)
    });
    registry.register("basic/pass", |shape| {
        shape.input("in", "*").output("out", "*");
        Box::new(Pass)
    });
    registry.register("math/accumulate", |shape| {
        shape
            .input("in", "number")
            .output("out", "number")
            .property("increment", 1);
        Box::new(Accumulate)
    });
    registry.register("input/button", |shape| {
        shape.output("clicked", "EVENT");
        Box::new(Button)
    });
    registry.register("events/counter", |shape| {
        shape
            .input("inc", "ACTION")
            .input("reset", "ACTION")
            .output("count", "number")
            .output("changed", "EVENT")
            .property("count", 0);
        Box::new(Counter { count: 0 })
    });
    registry.register("events/timer", |shape| {
        shape.output("tick", "EVENT").property("interval", 1.0);
        Box::new(Timer { remaining: 0.0 })
    });
    registry.register("events/echo", |shape| {
        shape
            .input("in", "ACTION")
            .output("out", "EVENT")
            .property("received", 0);
        Box::new(Echo)
    });
    registry.register("debug/lifecycle", |shape| {
        shape.property("fail_on", "");
        Box::new(Lifecycle)
    });
    registry
}

pub fn shared_registry() -> Arc<Registry> {
    Arc::new(registry())
}

/// A registry whose nodes log every execution into a shared journal.
pub fn journaled_registry() -> (Arc<Registry>, Arc<Journal>) {
    let registry = registry();
    registry.insert_resource(JOURNAL, Journal::default());
    let journal = registry
        .resource::<Journal>(JOURNAL)
        .expect("journal was just inserted");
    (Arc::new(registry), journal)
}

/// A registry whose `debug/lifecycle` nodes log their hooks into a shared
/// journal.
pub fn lifecycle_registry() -> (Arc<Registry>, Arc<HookJournal>) {
    let registry = registry();
    registry.insert_resource(HOOK_JOURNAL, HookJournal::default());
    let journal = registry
        .resource::<HookJournal>(HOOK_JOURNAL)
        .expect("journal was just inserted");
    (Arc::new(registry), journal)
}
