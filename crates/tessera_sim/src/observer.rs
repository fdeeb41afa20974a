//! Settle-complete notifications.
//!
//! After every activated clock edge has been advanced and the circuit has
//! settled again, the simulation calls each registered [`SettleObserver`] once
//! per activated domain. Observers get a read-only [`StateView`] and may ask
//! the run to stop.

use crate::alloc::OffsetTable;
use crate::domain::EdgeKind;
use crate::time::SimTime;
use std::cell::RefCell;
use std::rc::Rc;
use tessera_common::BitState;
use tessera_ir::{Circuit, ClockId, NodePort};

/// Whether a run should go on after a notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Control {
    /// Keep running.
    Continue,
    /// Stop after the current edge instant.
    Stop,
}

/// Which edge just completed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EdgeReport {
    /// Time of the edge.
    pub time: SimTime,
    /// The activated clock.
    pub clock: ClockId,
    /// Direction of the edge.
    pub kind: EdgeKind,
    /// Active edges of this clock so far, including this one.
    pub cycle: u64,
}

/// Read-only access to the settled state.
#[derive(Clone, Copy)]
pub struct StateView<'a> {
    pub(crate) circuit: &'a Circuit,
    pub(crate) offsets: &'a OffsetTable,
    pub(crate) state: &'a BitState,
}

impl<'a> StateView<'a> {
    /// The circuit being simulated.
    pub fn circuit(&self) -> &'a Circuit {
        self.circuit
    }

    /// The whole state vector.
    pub fn state(&self) -> &'a BitState {
        self.state
    }

    /// The storage layout.
    pub fn offsets(&self) -> &'a OffsetTable {
        self.offsets
    }

    /// Current value of an output port.
    ///
    /// # Panics
    ///
    /// Panics if the port does not exist.
    pub fn read(&self, port: NodePort) -> BitState {
        self.slot(port).read(self.state)
    }

    /// Current value of an output port as an integer, if it is fully defined
    /// and at most 64 bits wide.
    pub fn read_u64(&self, port: NodePort) -> Option<u64> {
        self.slot(port).read_u64(self.state)
    }

    fn slot(&self, port: NodePort) -> crate::behavior::Slot {
        match self.offsets.output(port) {
            Some(slot) => slot,
            None => panic!("no output port {port}"),
        }
    }
}

/// Receives a notification after each settled clock edge.
pub trait SettleObserver {
    /// Called once per activated domain after the post-edge settle.
    fn on_settled(&mut self, edge: &EdgeReport, view: &StateView<'_>) -> Control;
}

impl<F> SettleObserver for F
where
    F: FnMut(&EdgeReport, &StateView<'_>) -> Control,
{
    fn on_settled(&mut self, edge: &EdgeReport, view: &StateView<'_>) -> Control {
        self(edge, view)
    }
}

/// One row recorded by a [`ProbeRecorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeSample {
    /// The edge after which the values were sampled.
    pub edge: EdgeReport,
    /// One value per probed port, in probe order.
    pub values: Vec<BitState>,
}

/// Shared handle to the samples of a [`ProbeRecorder`].
#[derive(Clone, Debug, Default)]
pub struct ProbeLog(Rc<RefCell<Vec<ProbeSample>>>);

impl ProbeLog {
    /// A copy of every sample recorded so far.
    pub fn samples(&self) -> Vec<ProbeSample> {
        self.0.borrow().clone()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Values of probe `index` over time, as integers where fully defined.
    pub fn series_u64(&self, index: usize) -> Vec<Option<u64>> {
        self.0
            .borrow()
            .iter()
            .map(|s| s.values[index].to_u64())
            .collect()
    }
}

/// Samples chosen ports after every settled edge of chosen clocks.
pub struct ProbeRecorder {
    ports: Vec<NodePort>,
    clock: Option<ClockId>,
    log: ProbeLog,
}

impl ProbeRecorder {
    /// Samples `ports` after every edge of every clock.
    pub fn new(ports: Vec<NodePort>) -> Self {
        Self {
            ports,
            clock: None,
            log: ProbeLog::default(),
        }
    }

    /// Only samples after edges of `clock`.
    pub fn on_clock(mut self, clock: ClockId) -> Self {
        self.clock = Some(clock);
        self
    }

    /// A handle for reading the samples after the recorder has been handed
    /// to a simulation.
    pub fn log(&self) -> ProbeLog {
        self.log.clone()
    }
}

impl SettleObserver for ProbeRecorder {
    fn on_settled(&mut self, edge: &EdgeReport, view: &StateView<'_>) -> Control {
        if self.clock.is_none_or(|clock| clock == edge.clock) {
            let values = self.ports.iter().map(|&port| view.read(port)).collect();
            self.log.0.borrow_mut().push(ProbeSample {
                edge: *edge,
                values,
            });
        }
        Control::Continue
    }
}
