//! Multiple, derived and simultaneous clock domains.

mod common;

use common::*;
use std::collections::BTreeMap;
use tessera_common::Frequency;
use tessera_ir::{Circuit, ClockSpec, TriggerEdge};
use tessera_sim::{DomainPhase, EdgeKind, RunOutcome, SimConfig, SimTime, Simulation};

#[test]
fn independent_domains_interleave() {
    let mut c = Circuit::new();
    let fast = clock(&mut c, "fast", mhz(100));
    let slow = clock(&mut c, "slow", mhz(40));
    let (a, _) = counter(&mut c, "a", 8, fast);
    let (b, _) = counter(&mut c, "b", 8, slow);

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    let summary = sim.run_until(SimTime::from_ns(100)).unwrap();
    assert_eq!(summary.outcome, RunOutcome::TimeLimit);
    assert_eq!(summary.time, SimTime::from_ns(100));
    assert_eq!(sim.read_u64(a), Some(10));
    assert_eq!(sim.read_u64(b), Some(4));
    assert_eq!(sim.domain(fast).cycles(), 10);
    assert_eq!(sim.domain(slow).cycles(), 4);
    // Edges at 10, 20, ... ns and 25, 50, 75, 100 ns; 100 ns is shared.
    assert_eq!(summary.edges, 13);
}

#[test]
fn run_until_between_edges_moves_time() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", mhz(100));
    let (q, _) = counter(&mut c, "q", 8, clk);
    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    sim.run_until(SimTime::from_ps(35_000)).unwrap();
    assert_eq!(sim.time(), SimTime::from_ps(35_000));
    assert_eq!(sim.read_u64(q), Some(3));
    assert_eq!(sim.domain(clk).next_edge().time, SimTime::from_ns(40));
}

#[test]
fn run_until_respects_configured_time_budget() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", mhz(100));
    let (q, _) = counter(&mut c, "q", 8, clk);
    let config = SimConfig {
        limits: tessera_sim::RunLimits {
            max_time: Some(SimTime::from_ns(25)),
            max_edges: None,
        },
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(&c, config).unwrap();
    let summary = sim.run_until(SimTime::from_ns(100)).unwrap();
    assert_eq!(summary.outcome, RunOutcome::TimeLimit);
    assert_eq!(summary.time, SimTime::from_ns(20));
    assert_eq!(sim.time(), SimTime::from_ns(20));
    assert_eq!(sim.read_u64(q), Some(2));

    // An end inside the budget still moves time forward.
    let summary = sim.run_until(SimTime::from_ns(22)).unwrap();
    assert_eq!(summary.time, SimTime::from_ns(22));
}

#[test]
fn derived_clock_follows_parent() {
    let mut c = Circuit::new();
    let parent = clock(&mut c, "parent", mhz(100));
    let half = c.add_clock("half", ClockSpec::derived(parent, 1, 2));
    let triple = c.add_clock("triple", ClockSpec::derived(parent, 3, 1));
    let (p, _) = counter(&mut c, "p", 8, parent);
    let (h, _) = counter(&mut c, "h", 8, half);
    let (t, _) = counter(&mut c, "t", 8, triple);

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    assert_eq!(sim.domain(half).frequency(), mhz(50));
    assert_eq!(sim.domain(triple).frequency(), mhz(300));
    let summary = sim.run_cycles(parent, 8).unwrap();
    assert_eq!(summary.outcome, RunOutcome::CycleTarget);
    assert_eq!(sim.time(), SimTime::from_ns(80));
    assert_eq!(sim.read_u64(p), Some(8));
    assert_eq!(sim.read_u64(h), Some(4));
    assert_eq!(sim.read_u64(t), Some(24));
}

#[test]
fn overriding_parent_moves_derived_clock() {
    let mut c = Circuit::new();
    let parent = clock(&mut c, "parent", mhz(100));
    let half = c.add_clock("half", ClockSpec::derived(parent, 1, 2));
    let config = SimConfig {
        clock_frequencies: BTreeMap::from([("parent".to_string(), mhz(10))]),
        ..SimConfig::default()
    };
    let sim = Simulation::new(&c, config).unwrap();
    assert_eq!(sim.domain(parent).frequency(), mhz(10));
    assert_eq!(sim.domain(half).frequency(), mhz(5));
    assert_eq!(sim.domain(half).next_edge().time, SimTime::from_ns(200));
}

fn sampler(declare_sampler_first: bool) -> Vec<(u64, u64)> {
    let mut c = Circuit::new();
    let (clk_a, clk_b) = if declare_sampler_first {
        let b = clock(&mut c, "b", mhz(10));
        (clock(&mut c, "a", mhz(10)), b)
    } else {
        let a = clock(&mut c, "a", mhz(10));
        (a, clock(&mut c, "b", mhz(10)))
    };
    let (ra, _) = counter(&mut c, "ra", 8, clk_a);
    let rb = register(&mut c, "rb", 8, Some(0), clk_b);
    c.connect(ra, rb, 0).unwrap();

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    (0..4)
        .map(|_| {
            sim.step().unwrap();
            (sim.read_u64(ra).unwrap(), sim.read_u64(rb).unwrap())
        })
        .collect()
}

#[test]
fn simultaneous_edges_sample_pre_edge_values() {
    let expected = vec![(1, 0), (2, 1), (3, 2), (4, 3)];
    assert_eq!(sampler(false), expected);
    // Clock ids do not decide who sees whose update.
    assert_eq!(sampler(true), expected);
}

#[test]
fn falling_and_double_edge_triggers() {
    let mut c = Circuit::new();
    let rise = clock(&mut c, "rise", mhz(1));
    let fall = c.add_clock("fall", ClockSpec::new(mhz(1)).with_trigger(TriggerEdge::Falling));
    let both = c.add_clock("both", ClockSpec::new(mhz(1)).with_trigger(TriggerEdge::Both));
    let (r, _) = counter(&mut c, "r", 8, rise);
    let (f, _) = counter(&mut c, "f", 8, fall);
    let (b, _) = counter(&mut c, "b", 8, both);

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    let first = sim.domain(fall).next_edge();
    assert_eq!(first.kind, EdgeKind::Falling);
    assert_eq!(first.time, SimTime::from_ns(500));
    assert_eq!(sim.domain(rise).next_edge().kind, EdgeKind::Rising);

    sim.run_until(SimTime::from_us(2)).unwrap();
    assert_eq!(sim.read_u64(r), Some(2));
    assert_eq!(sim.read_u64(f), Some(2));
    assert_eq!(sim.read_u64(b), Some(4));
    assert_eq!(sim.domain(both).phase(), DomainPhase::Waiting);
}

#[test]
fn edge_times_stay_exact() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", Frequency::from_hz(3_000_000));
    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    let first = sim.domain(clk).next_edge().time;
    assert_eq!(first.as_fs(), None, "a third of a microsecond is not whole femtoseconds");
    sim.run_cycles(clk, 3).unwrap();
    assert_eq!(sim.time(), SimTime::from_us(1));
}

#[test]
fn time_limit_stops_before_later_edges() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", mhz(1));
    let (q, _) = counter(&mut c, "q", 8, clk);
    let mut config = SimConfig::default();
    config.limits.max_time = Some(SimTime::from_ns(3_500));
    let mut sim = Simulation::new(&c, config).unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.outcome, RunOutcome::TimeLimit);
    assert_eq!(summary.time, SimTime::from_us(3));
    assert_eq!(sim.read_u64(q), Some(3));
}
