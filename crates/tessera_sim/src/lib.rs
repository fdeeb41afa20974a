//! Cycle-based, bit-accurate simulator for Tessera circuits.
//!
//! This crate takes a validated [`Circuit`] from `tessera_ir` and simulates it
//! with two-plane three-valued logic: every signal bit has a VALUE bit and a
//! DEFINED bit, and undefined bits propagate conservatively through every
//! node.
//!
//! # Architecture
//!
//! All signal, register and memory bits live in one packed [`BitState`]
//! owned by the [`Simulation`]. At build time the allocator gives every
//! output and internal slot a bit range, and connected inputs simply read
//! their driver's range. Nodes never hold state of their own; they are
//! [`NodeBehavior`] objects that read and write their slots during `reset`,
//! `evaluate` and `advance`.
//!
//! Time advances in clock edges with exact rational timestamps. Each clock
//! has a [`ClockDomain`]; edges of several domains at the same instant are
//! processed together so no domain sees another's post-edge values.
//!
//! # Usage
//!
//! ```ignore
//! use tessera_sim::{Simulation, SimConfig};
//!
//! let mut sim = Simulation::new(&circuit, SimConfig::default())?;
//! sim.set_input_u64(enable, 1)?;
//! sim.run_cycles(clk, 10)?;
//! println!("count = {:?}", sim.read_u64(counter));
//! ```
//!
//! # Modules
//!
//! - `behavior` - the node contract and slot accessors
//! - `alloc` - state vector layout
//! - `order` - evaluation order and settle cones
//! - `domain` - clock domains and the edge queue
//! - `nodes` - built-in behaviors for every node kind
//! - `observer` - settle notifications and probe recording
//! - `simulation` - the scheduler and testbench API
//! - `config` - run configuration and its TOML loader
//! - `time` - exact simulation time

#![warn(missing_docs)]

pub mod alloc;
pub mod behavior;
pub mod config;
pub mod domain;
pub mod error;
pub mod nodes;
pub mod observer;
pub mod order;
pub mod simulation;
pub mod time;

use tessera_ir::Circuit;

pub use alloc::{NodeOffsets, OffsetTable, SlotAllocator};
pub use behavior::{NodeBehavior, OutputTiming, Slot};
pub use config::{load_config, load_config_from_str, RunLimits, SimConfig};
pub use domain::{ClockDomain, DomainPhase, EdgeKind};
pub use error::{ConfigError, SimError};
pub use observer::{
    Control, EdgeReport, ProbeLog, ProbeRecorder, ProbeSample, SettleObserver, StateView,
};
pub use order::{Cone, EvaluationOrder};
pub use simulation::{RunOutcome, RunSummary, Simulation, SimulationBuilder, StepResult};
pub use tessera_common::BitState;
pub use time::SimTime;

/// High-level entry point: builds a simulation of `circuit` and runs it
/// until the configured limits end it.
///
/// A clocked circuit runs forever unless `config.limits` bounds it.
pub fn simulate(circuit: &Circuit, config: &SimConfig) -> Result<RunSummary, SimError> {
    let mut sim = Simulation::new(circuit, config.clone())?;
    sim.run()
}
