//! Runtime clock domains and the pending-edge queue.
//!
//! A clock of frequency `f` (period `T`) is high on `[kT, kT + T/2)` and low
//! on `[kT + T/2, (k+1)T)`. Counting half periods from power-on, edge `n`
//! happens at `n·T/2`: odd `n` are falling edges, even `n ≥ 2` rising ones.
//! Power-on itself is not an edge.

use crate::time::SimTime;
use num::rational::Ratio;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tessera_common::Frequency;
use tessera_ir::{ClockId, ResetPolicy, TriggerEdge};

/// Direction of a clock transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EdgeKind {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

impl EdgeKind {
    fn of_half_period(n: u64) -> Self {
        if n % 2 == 0 {
            EdgeKind::Rising
        } else {
            EdgeKind::Falling
        }
    }
}

/// Where a domain is in its edge cycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DomainPhase {
    /// Power-on reset has not run yet.
    Reset,
    /// Idle until its next active edge.
    Waiting,
    /// Processing an active edge.
    Active,
}

/// Scheduler state of one clock.
#[derive(Clone, Debug)]
pub struct ClockDomain {
    id: ClockId,
    frequency: Frequency,
    trigger: TriggerEdge,
    reset: ResetPolicy,
    phase: DomainPhase,
    next_half_period: u64,
    cycles: u64,
}

impl ClockDomain {
    /// Creates a domain in the [`Reset`](DomainPhase::Reset) phase.
    pub fn new(id: ClockId, frequency: Frequency, trigger: TriggerEdge, reset: ResetPolicy) -> Self {
        Self {
            id,
            frequency,
            trigger,
            reset,
            phase: DomainPhase::Reset,
            next_half_period: next_active(trigger, 0),
            cycles: 0,
        }
    }

    /// The clock this domain runs.
    pub fn id(&self) -> ClockId {
        self.id
    }

    /// Resolved frequency.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Active edge(s).
    pub fn trigger(&self) -> TriggerEdge {
        self.trigger
    }

    /// Reset policy of the domain.
    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset
    }

    /// Current phase.
    pub fn phase(&self) -> DomainPhase {
        self.phase
    }

    /// Number of active edges processed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The next active edge.
    pub fn next_edge(&self) -> PendingEdge {
        PendingEdge {
            time: edge_time(self.frequency, self.next_half_period),
            clock: self.id,
            kind: EdgeKind::of_half_period(self.next_half_period),
        }
    }

    pub(crate) fn finish_reset(&mut self) {
        self.phase = DomainPhase::Waiting;
    }

    pub(crate) fn activate(&mut self) {
        debug_assert_eq!(self.phase, DomainPhase::Waiting);
        self.phase = DomainPhase::Active;
    }

    /// Leaves the active phase and moves on to the following edge.
    pub(crate) fn complete(&mut self) {
        self.cycles += 1;
        self.next_half_period = next_active(self.trigger, self.next_half_period);
        self.phase = DomainPhase::Waiting;
    }
}

/// First half period after `after` whose edge activates a `trigger` domain.
fn next_active(trigger: TriggerEdge, after: u64) -> u64 {
    let mut n = after + 1;
    while !trigger.fires_on(EdgeKind::of_half_period(n) == EdgeKind::Rising) {
        n += 1;
    }
    n
}

/// Time of half-period `n` of a clock: `n / (2f)` seconds.
pub fn edge_time(frequency: Frequency, n: u64) -> SimTime {
    let hz = frequency.hz();
    SimTime::from_secs(Ratio::new(
        n as u128 * *hz.denom() as u128,
        2 * *hz.numer() as u128,
    ))
}

/// A scheduled clock edge.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PendingEdge {
    /// When the edge happens.
    pub time: SimTime,
    /// Which clock.
    pub clock: ClockId,
    /// Rising or falling.
    pub kind: EdgeKind,
}

impl Ord for PendingEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.clock.cmp(&other.clock))
    }
}

impl PartialOrd for PendingEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue of pending edges, earliest first and by clock id on ties.
#[derive(Debug, Default)]
pub struct EdgeQueue {
    heap: BinaryHeap<Reverse<PendingEdge>>,
}

impl EdgeQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an edge.
    pub fn push(&mut self, edge: PendingEdge) {
        self.heap.push(Reverse(edge));
    }

    /// Time of the earliest pending edge.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(edge)| edge.time)
    }

    /// Removes every edge at the earliest pending time, in clock id order.
    pub fn pop_simultaneous(&mut self) -> Vec<PendingEdge> {
        let mut edges = Vec::new();
        let Some(time) = self.peek_time() else {
            return edges;
        };
        while let Some(Reverse(edge)) = self.heap.peek() {
            if edge.time != time {
                break;
            }
            edges.push(*edge);
            self.heap.pop();
        }
        edges
    }

    /// Number of pending edges.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(hz: u64, trigger: TriggerEdge) -> ClockDomain {
        ClockDomain::new(
            ClockId::from_raw(0),
            Frequency::from_hz(hz),
            trigger,
            ResetPolicy::default(),
        )
    }

    #[test]
    fn rising_edges_at_whole_periods() {
        let mut d = domain(100_000_000, TriggerEdge::Rising);
        d.finish_reset();
        let first = d.next_edge();
        assert_eq!(first.time, SimTime::from_ns(10));
        assert_eq!(first.kind, EdgeKind::Rising);
        d.activate();
        d.complete();
        assert_eq!(d.next_edge().time, SimTime::from_ns(20));
        assert_eq!(d.cycles(), 1);
        assert_eq!(d.phase(), DomainPhase::Waiting);
    }

    #[test]
    fn falling_and_both_edges() {
        let d = domain(100_000_000, TriggerEdge::Falling);
        assert_eq!(d.next_edge().time, SimTime::from_ns(5));
        assert_eq!(d.next_edge().kind, EdgeKind::Falling);

        let mut d = domain(100_000_000, TriggerEdge::Both);
        d.finish_reset();
        let mut seen = Vec::new();
        for _ in 0..4 {
            let e = d.next_edge();
            seen.push((e.time, e.kind));
            d.activate();
            d.complete();
        }
        assert_eq!(
            seen,
            vec![
                (SimTime::from_ns(5), EdgeKind::Falling),
                (SimTime::from_ns(10), EdgeKind::Rising),
                (SimTime::from_ns(15), EdgeKind::Falling),
                (SimTime::from_ns(20), EdgeKind::Rising),
            ]
        );
    }

    #[test]
    fn edge_times_are_exact() {
        let f = Frequency::from_ratio(100_000_000, 3).unwrap();
        assert_eq!(edge_time(f, 2), SimTime::from_ns(30));
        assert_eq!(edge_time(f, 1), SimTime::from_ns(15));
        // 3 MHz has no whole-femtosecond half period but stays exact.
        let f = Frequency::from_hz(3_000_000);
        assert_eq!(edge_time(f, 6), SimTime::from_ns(1000));
        assert_eq!(edge_time(f, 1).as_fs(), None);
    }

    #[test]
    fn queue_pops_simultaneous_edges_by_clock() {
        let mut q = EdgeQueue::new();
        let at = |ns, clock| PendingEdge {
            time: SimTime::from_ns(ns),
            clock: ClockId::from_raw(clock),
            kind: EdgeKind::Rising,
        };
        q.push(at(20, 2));
        q.push(at(10, 1));
        q.push(at(20, 0));
        q.push(at(30, 0));
        assert_eq!(q.pop_simultaneous(), vec![at(10, 1)]);
        assert_eq!(q.pop_simultaneous(), vec![at(20, 0), at(20, 2)]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek_time(), Some(SimTime::from_ns(30)));
        q.pop_simultaneous();
        assert!(q.is_empty());
        assert!(q.pop_simultaneous().is_empty());
    }
}
