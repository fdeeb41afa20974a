//! The multi-domain scheduler and testbench surface.
//!
//! A [`Simulation`] owns the state vector of one circuit. Building it
//! validates the circuit, lays out storage, orders the nodes and runs the
//! power-on reset. From then on time only moves forward in clock edges:
//!
//! 1. pop every pending edge at the earliest time,
//! 2. settle the fan-in cones of the activated domains,
//! 3. advance every node bound to an activated clock,
//! 4. settle the fan-out cones,
//! 5. schedule the following edges and notify observers.
//!
//! Advancing happens only after all fan-in settles, so two domains with a
//! simultaneous edge both latch the values from before the instant, whatever
//! their clock ids.

use crate::alloc::OffsetTable;
use crate::behavior::{NodeBehavior, Slot};
use crate::config::SimConfig;
use crate::domain::{ClockDomain, EdgeQueue, PendingEdge};
use crate::error::SimError;
use crate::nodes::behavior_for;
use crate::observer::{Control, EdgeReport, SettleObserver, StateView};
use crate::order::{Cone, EvaluationOrder};
use crate::time::SimTime;
use std::collections::HashMap;
use tessera_common::{BitState, ContentHash};
use tessera_ir::{Circuit, ClockId, NodeId, NodeKind, NodePort};
use tracing::{debug, info, trace};

/// Why a run ended.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RunOutcome {
    /// No edge is pending. Only happens for circuits without clocks.
    Starved,
    /// An observer or [`Simulation::request_stop`] asked to stop.
    Stopped,
    /// The next edge lies past the time limit.
    TimeLimit,
    /// The configured number of edge instants was processed.
    EdgeLimit,
    /// [`Simulation::run_cycles`] reached its cycle count.
    CycleTarget,
}

/// The result of a single [`Simulation::step`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepResult {
    /// One edge instant was processed.
    Advanced,
    /// Nothing was processed and the run is over.
    Finished(RunOutcome),
}

/// Summary of a completed run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RunSummary {
    /// Why the run ended.
    pub outcome: RunOutcome,
    /// Simulation time at the end of the run.
    pub time: SimTime,
    /// Edge instants processed since power-on.
    pub edges: u64,
}

/// Configures and builds a [`Simulation`].
pub struct SimulationBuilder<'c> {
    circuit: &'c Circuit,
    config: SimConfig,
    behaviors: HashMap<NodeId, Box<dyn NodeBehavior>>,
    observers: Vec<Box<dyn SettleObserver + 'c>>,
}

impl<'c> SimulationBuilder<'c> {
    /// Replaces the configuration (default: [`SimConfig::default`]).
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Simulates `node` with a custom behavior instead of the one its kind
    /// implies. The behavior must honor the node's port widths.
    pub fn behavior(mut self, node: NodeId, behavior: Box<dyn NodeBehavior>) -> Self {
        self.behaviors.insert(node, behavior);
        self
    }

    /// Registers an observer, notified after every settled edge.
    pub fn observer(mut self, observer: impl SettleObserver + 'c) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Validates the circuit and performs the power-on reset.
    pub fn build(self) -> Result<Simulation<'c>, SimError> {
        let Self {
            circuit,
            config,
            mut behaviors,
            observers,
        } = self;
        circuit.validate()?;
        let overrides = config.frequency_overrides(circuit)?;

        let behaviors: Vec<Box<dyn NodeBehavior>> = circuit
            .nodes()
            .map(|(id, _)| {
                behaviors
                    .remove(&id)
                    .unwrap_or_else(|| behavior_for(circuit, id))
            })
            .collect();
        let order = EvaluationOrder::build(circuit, &behaviors)?;
        let offsets = OffsetTable::build(circuit, &behaviors, &order.full().nodes);

        let mut domains = Vec::with_capacity(circuit.clock_count());
        for (id, clock) in circuit.clocks() {
            let frequency = circuit.resolve_frequency(id, &overrides)?;
            debug!(clock = %circuit.clock_name(id), %frequency, members = order.members(id).len(), "clock domain");
            domains.push(ClockDomain::new(id, frequency, clock.trigger, clock.reset));
        }

        info!(
            nodes = circuit.node_count(),
            clocks = circuit.clock_count(),
            bits = offsets.total_bits(),
            shared_outputs = offsets.shared_outputs(),
            "state vector allocated"
        );

        let mut sim = Simulation {
            circuit,
            state: BitState::with_len(offsets.total_bits()),
            late_slots: late_writer_slots(&order, &offsets),
            behaviors,
            order,
            offsets,
            domains,
            queue: EdgeQueue::new(),
            observers,
            config,
            time: SimTime::zero(),
            edges: 0,
            dirty: false,
            stop_requested: false,
        };
        sim.power_on()?;
        Ok(sim)
    }
}

/// A running simulation of one circuit.
pub struct Simulation<'c> {
    circuit: &'c Circuit,
    config: SimConfig,
    behaviors: Vec<Box<dyn NodeBehavior>>,
    order: EvaluationOrder,
    offsets: OffsetTable,
    late_slots: HashMap<NodeId, Vec<Slot>>,
    state: BitState,
    domains: Vec<ClockDomain>,
    queue: EdgeQueue,
    observers: Vec<Box<dyn SettleObserver + 'c>>,
    time: SimTime,
    edges: u64,
    dirty: bool,
    stop_requested: bool,
}

impl<'c> Simulation<'c> {
    /// Starts configuring a simulation of `circuit`.
    pub fn builder(circuit: &'c Circuit) -> SimulationBuilder<'c> {
        SimulationBuilder {
            circuit,
            config: SimConfig::default(),
            behaviors: HashMap::new(),
            observers: Vec::new(),
        }
    }

    /// Builds a simulation with built-in behaviors and no observers.
    pub fn new(circuit: &'c Circuit, config: SimConfig) -> Result<Self, SimError> {
        Self::builder(circuit).config(config).build()
    }

    fn power_on(&mut self) -> Result<(), SimError> {
        self.reset_nodes();
        for domain in &mut self.domains {
            domain.finish_reset();
            self.queue.push(domain.next_edge());
        }
        self.settle()?;
        info!(fingerprint = %self.fingerprint(), "power-on reset complete");
        Ok(())
    }

    fn reset_nodes(&mut self) {
        for (id, _) in self.circuit.nodes() {
            let slots = self.offsets.node(id);
            self.behaviors[id.index()].reset(&mut self.state, &slots.internal, &slots.outputs);
        }
    }

    /// Re-runs the power-on reset of every node and settles.
    ///
    /// Time, pending edges and cycle counts are left alone. Input pins go
    /// back to their power-on values.
    pub fn reset_state(&mut self) -> Result<(), SimError> {
        self.reset_nodes();
        self.settle()
    }

    /// Drives an input node. The new value propagates at the next
    /// [`settle`](Self::settle) or edge.
    pub fn set_input(&mut self, node: NodeId, value: &BitState) -> Result<(), SimError> {
        let reject = |reason: String| SimError::InvalidPoke {
            node: self.circuit.name(node).to_string(),
            reason,
        };
        let width = match &self.circuit.node(node).kind {
            NodeKind::Input { ty, .. } => ty.width as usize,
            other => return Err(reject(format!("{} node is not an input", other.name()))),
        };
        if value.len() != width {
            return Err(reject(format!(
                "expected {width} bits, got {}",
                value.len()
            )));
        }
        let slot = self.offsets.node(node).outputs[0];
        slot.write(&mut self.state, value);
        self.dirty = true;
        Ok(())
    }

    /// Drives an input node with the low bits of `value`.
    pub fn set_input_u64(&mut self, node: NodeId, value: u64) -> Result<(), SimError> {
        let width = match &self.circuit.node(node).kind {
            NodeKind::Input { ty, .. } => ty.width as usize,
            _ => 0,
        };
        self.set_input(node, &BitState::from_u64(value, width))
    }

    /// Evaluates every node until the circuit is consistent with its inputs.
    pub fn settle(&mut self) -> Result<(), SimError> {
        let passes = settle_cone(
            self.order.full(),
            &self.behaviors,
            &self.offsets,
            &self.late_slots,
            &mut self.state,
            self.config.max_settle_passes,
            self.time,
        )?;
        trace!(passes, "full settle");
        self.dirty = false;
        Ok(())
    }

    /// Asks the current or next run to stop before the next edge instant.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Processes the next edge instant, unless a stop request or a limit
    /// ends the run first.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        if std::mem::take(&mut self.stop_requested) {
            return Ok(StepResult::Finished(RunOutcome::Stopped));
        }
        let Some(next) = self.queue.peek_time() else {
            return Ok(StepResult::Finished(RunOutcome::Starved));
        };
        if self.config.limits.max_time.is_some_and(|max| next > max) {
            return Ok(StepResult::Finished(RunOutcome::TimeLimit));
        }
        if self.config.limits.max_edges.is_some_and(|max| self.edges >= max) {
            return Ok(StepResult::Finished(RunOutcome::EdgeLimit));
        }
        if self.dirty {
            self.settle()?;
        }

        let edges = self.queue.pop_simultaneous();
        self.time = next;
        for edge in &edges {
            self.domains[edge.clock.index()].activate();
        }
        debug!(
            time = %self.time,
            clocks = ?edges.iter().map(|e| e.clock).collect::<Vec<_>>(),
            "edge instant"
        );

        let fan_in = self.order.merge(edges.iter().map(|e| self.order.fan_in(e.clock)));
        self.settle_partial(&fan_in, "fan-in")?;

        for edge in &edges {
            for &(node, _) in self.order.members(edge.clock) {
                let slots = self.offsets.node(node);
                self.behaviors[node.index()].sample(&mut self.state, &slots.internal, &slots.inputs);
            }
        }
        for edge in &edges {
            for &(node, port) in self.order.members(edge.clock) {
                let slots = self.offsets.node(node);
                self.behaviors[node.index()].advance(
                    &mut self.state,
                    &slots.internal,
                    &slots.outputs,
                    port,
                );
            }
        }

        let fan_out = self.order.merge(edges.iter().map(|e| self.order.fan_out(e.clock)));
        self.settle_partial(&fan_out, "fan-out")?;

        for edge in &edges {
            let domain = &mut self.domains[edge.clock.index()];
            domain.complete();
            self.queue.push(domain.next_edge());
        }
        self.edges += 1;
        self.notify(&edges);
        Ok(StepResult::Advanced)
    }

    fn settle_partial(&mut self, cone: &Cone, what: &'static str) -> Result<(), SimError> {
        let passes = settle_cone(
            cone,
            &self.behaviors,
            &self.offsets,
            &self.late_slots,
            &mut self.state,
            self.config.max_settle_passes,
            self.time,
        )?;
        trace!(cone = what, nodes = cone.nodes.len(), passes, "settled");
        Ok(())
    }

    fn notify(&mut self, edges: &[PendingEdge]) {
        if self.observers.is_empty() {
            return;
        }
        let view = StateView {
            circuit: self.circuit,
            offsets: &self.offsets,
            state: &self.state,
        };
        for edge in edges {
            let report = EdgeReport {
                time: edge.time,
                clock: edge.clock,
                kind: edge.kind,
                cycle: self.domains[edge.clock.index()].cycles(),
            };
            for observer in &mut self.observers {
                if observer.on_settled(&report, &view) == Control::Stop {
                    debug!(clock = %edge.clock, time = %edge.time, "observer requested stop");
                    self.stop_requested = true;
                }
            }
        }
    }

    /// Runs until a limit, a stop request or starvation ends the run.
    ///
    /// A clocked circuit never starves, so without limits only a stop
    /// request ends the run.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.run_with(|_| None)
    }

    /// Processes every edge up to and including time `end`, then moves the
    /// current time to `end`.
    ///
    /// If a limit or stop request ends the run earlier, the time stays at the
    /// last processed edge.
    pub fn run_until(&mut self, end: SimTime) -> Result<RunSummary, SimError> {
        let mut reached_end = false;
        let mut summary = self.run_with(|sim| {
            let outcome = match sim.queue.peek_time() {
                None => RunOutcome::Starved,
                Some(next) if next > end => RunOutcome::TimeLimit,
                Some(_) => return None,
            };
            reached_end = true;
            Some(outcome)
        })?;
        let end = self.config.limits.max_time.map_or(end, |max| end.min(max));
        if reached_end && self.time < end {
            self.time = end;
            summary.time = end;
        }
        Ok(summary)
    }

    /// Runs until `clock` has processed `cycles` more active edges.
    pub fn run_cycles(&mut self, clock: ClockId, cycles: u64) -> Result<RunSummary, SimError> {
        let target = self.domains[clock.index()].cycles() + cycles;
        self.run_with(|sim| (sim.domains[clock.index()].cycles() >= target).then_some(RunOutcome::CycleTarget))
    }

    fn run_with(
        &mut self,
        mut done: impl FnMut(&Self) -> Option<RunOutcome>,
    ) -> Result<RunSummary, SimError> {
        let start = self.edges;
        let outcome = loop {
            if std::mem::take(&mut self.stop_requested) {
                break RunOutcome::Stopped;
            }
            if let Some(outcome) = done(self) {
                break outcome;
            }
            if let StepResult::Finished(outcome) = self.step()? {
                break outcome;
            }
        };
        if self.dirty {
            self.settle()?;
        }
        info!(?outcome, time = %self.time, edges = self.edges - start, "run finished");
        Ok(self.summary(outcome))
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            time: self.time,
            edges: self.edges,
        }
    }

    /// Current value of an output port.
    ///
    /// # Panics
    ///
    /// Panics if the port does not exist.
    pub fn read(&self, port: impl Into<NodePort>) -> BitState {
        self.view().read(port.into())
    }

    /// Current value of an output port as an integer, if fully defined and at
    /// most 64 bits wide.
    pub fn read_u64(&self, port: impl Into<NodePort>) -> Option<u64> {
        self.view().read_u64(port.into())
    }

    /// Read-only view of the whole state, as observers see it.
    pub fn view(&self) -> StateView<'_> {
        StateView {
            circuit: self.circuit,
            offsets: &self.offsets,
            state: &self.state,
        }
    }

    /// The state vector.
    pub fn state(&self) -> &BitState {
        &self.state
    }

    /// Storage layout of the state vector.
    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Evaluation order and cones.
    pub fn order(&self) -> &EvaluationOrder {
        &self.order
    }

    /// Hash of the whole state vector.
    pub fn fingerprint(&self) -> ContentHash {
        self.state.fingerprint()
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Edge instants processed since power-on.
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Runtime state of one clock domain.
    pub fn domain(&self, clock: ClockId) -> &ClockDomain {
        &self.domains[clock.index()]
    }

    /// The circuit being simulated.
    pub fn circuit(&self) -> &'c Circuit {
        self.circuit
    }
}

fn late_writer_slots(order: &EvaluationOrder, offsets: &OffsetTable) -> HashMap<NodeId, Vec<Slot>> {
    order
        .full()
        .late_writers
        .iter()
        .map(|&id| (id, offsets.node(id).outputs.clone()))
        .collect()
}

/// Evaluates `cone` in order, repeating while outputs of its late writers
/// change. Returns the number of passes.
fn settle_cone(
    cone: &Cone,
    behaviors: &[Box<dyn NodeBehavior>],
    offsets: &OffsetTable,
    late_slots: &HashMap<NodeId, Vec<Slot>>,
    state: &mut BitState,
    max_passes: u32,
    time: SimTime,
) -> Result<u32, SimError> {
    let snapshot = |state: &BitState| -> Vec<BitState> {
        cone.late_writers
            .iter()
            .flat_map(|id| late_slots.get(id).into_iter().flatten())
            .map(|slot| slot.read(state))
            .collect()
    };
    let mut before = snapshot(state);
    for pass in 1..=max_passes {
        for &id in &cone.nodes {
            let slots = offsets.node(id);
            behaviors[id.index()].evaluate(state, &slots.internal, &slots.inputs, &slots.outputs);
        }
        if cone.late_writers.is_empty() {
            return Ok(pass);
        }
        let after = snapshot(state);
        if after == before {
            return Ok(pass);
        }
        trace!(pass, "asynchronous reset changed outputs, settling again");
        before = after;
    }
    Err(SimError::SettleLimit {
        passes: max_passes,
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::OutputTiming;
    use tessera_common::Frequency;
    use tessera_ir::{ClockSpec, ConnectionType, Interpretation, LogicOp, RegisterInput};

    fn input(c: &mut Circuit, name: &str, width: u32) -> NodeId {
        c.add_node(
            name,
            NodeKind::Input {
                ty: ConnectionType::unsigned(width),
                initial: None,
            },
        )
    }

    /// A 1-bit toggle: `q <= !q`, reset value 0.
    fn toggle() -> (Circuit, NodeId, ClockId) {
        let mut c = Circuit::new();
        let clk = c.add_clock("clk", ClockSpec::new(Frequency::from_hz(100)));
        let q = c.add_node(
            "q",
            NodeKind::Register {
                width: 1,
                reset_value: Some(BitState::from_bool(false)),
            },
        );
        let inv = c.add_node(
            "inv",
            NodeKind::Logic {
                op: LogicOp::Not,
                width: 1,
            },
        );
        c.connect(q, inv, 0).unwrap();
        c.connect(inv, q, RegisterInput::Data.index()).unwrap();
        c.attach_clock(q, 0, clk).unwrap();
        (c, q, clk)
    }

    #[test]
    fn toggle_flips_on_every_rising_edge() {
        let (c, q, clk) = toggle();
        let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
        assert_eq!(sim.read_u64(q), Some(0));
        for expected in [1, 0, 1, 0] {
            assert_eq!(sim.step().unwrap(), StepResult::Advanced);
            assert_eq!(sim.read_u64(q), Some(expected));
        }
        assert_eq!(sim.domain(clk).cycles(), 4);
        // Rising edges of a 100 Hz clock at 10, 20, 30 and 40 ms.
        assert_eq!(sim.time(), SimTime::from_us(40_000));
    }

    #[test]
    fn clockless_circuit_starves() {
        let mut c = Circuit::new();
        let a = input(&mut c, "a", 4);
        let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
        sim.set_input_u64(a, 9).unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.outcome, RunOutcome::Starved);
        assert_eq!(summary.edges, 0);
        assert_eq!(sim.read_u64(a), Some(9));
    }

    #[test]
    fn set_input_checks_kind_and_width() {
        let (c, q, _) = toggle();
        let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
        let err = sim.set_input(q, &BitState::from_bool(true)).unwrap_err();
        assert!(matches!(err, SimError::InvalidPoke { .. }));

        let mut c = Circuit::new();
        let a = input(&mut c, "a", 4);
        let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
        let err = sim.set_input(a, &BitState::from_u64(1, 3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot drive node 'a': expected 4 bits, got 3"
        );
    }

    #[test]
    fn request_stop_ends_next_run() {
        let (c, _, _) = toggle();
        let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
        sim.request_stop();
        let summary = sim.run().unwrap();
        assert_eq!(summary.outcome, RunOutcome::Stopped);
        assert_eq!(summary.edges, 0);
        // The request is consumed.
        assert_eq!(sim.step().unwrap(), StepResult::Advanced);
    }

    /// A register whose next value is always undefined, to check that a
    /// custom behavior replaces the built-in one.
    struct Poison;

    impl NodeBehavior for Poison {
        fn output_timing(&self) -> OutputTiming {
            OutputTiming::Registered
        }

        fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
            outputs[0].write(state, &BitState::from_bool(false));
        }

        fn evaluate(&self, _state: &mut BitState, _internal: &[Slot], _inputs: &[Slot], _outputs: &[Slot]) {}

        fn advance(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot], _clock_port: u32) {
            outputs[0].set_undefined(state);
        }
    }

    #[test]
    fn builder_installs_custom_behavior() {
        let (c, q, _) = toggle();
        let mut sim = Simulation::builder(&c)
            .behavior(q, Box::new(Poison))
            .build()
            .unwrap();
        assert_eq!(sim.read(q).to_string(), "0");
        sim.step().unwrap();
        assert_eq!(sim.read(q).to_string(), "X");
    }

    /// Forces its output to the inverse of itself on every evaluate.
    struct Oscillator;

    impl NodeBehavior for Oscillator {
        fn output_timing(&self) -> OutputTiming {
            OutputTiming::RegisteredAsyncReset
        }

        fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
            outputs[0].write(state, &BitState::from_bool(false));
        }

        fn evaluate(&self, state: &mut BitState, _internal: &[Slot], _inputs: &[Slot], outputs: &[Slot]) {
            let flipped = !outputs[0].logic(state, 0);
            state.set_logic(outputs[0].offset, flipped);
        }
    }

    #[test]
    fn settle_gives_up_on_oscillation() {
        let (c, q, _) = toggle();
        let config = SimConfig {
            max_settle_passes: 5,
            ..SimConfig::default()
        };
        let err = Simulation::builder(&c)
            .config(config)
            .behavior(q, Box::new(Oscillator))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "logic did not settle after 5 passes at 0 fs"
        );
    }

    #[test]
    fn constant_interpretation_does_not_matter_to_storage() {
        let mut c = Circuit::new();
        let k = c.add_node(
            "k",
            NodeKind::Constant {
                value: BitState::from_u64(0xA5, 8),
                interpretation: Interpretation::Signed,
            },
        );
        let sim = Simulation::new(&c, SimConfig::default()).unwrap();
        assert_eq!(sim.read_u64(k), Some(0xA5));
    }
}
