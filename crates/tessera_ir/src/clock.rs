//! Clock declarations.
//!
//! Every clock is an independent time base. Clocks are asynchronous to each
//! other unless one is declared as derived from another, in which case it
//! shares its parent's phase origin and runs at a rational multiple of the
//! parent frequency.

use crate::ids::ClockId;
use serde::{Deserialize, Serialize};
use tessera_common::{Frequency, Ident};

/// Which transitions of a clock activate its domain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum TriggerEdge {
    /// Low to high.
    #[default]
    Rising,
    /// High to low.
    Falling,
    /// Both transitions.
    Both,
}

impl TriggerEdge {
    /// Returns true if a rising (`true`) or falling (`false`) transition
    /// activates the domain.
    pub fn fires_on(self, rising: bool) -> bool {
        match self {
            TriggerEdge::Rising => rising,
            TriggerEdge::Falling => !rising,
            TriggerEdge::Both => true,
        }
    }
}

/// How a clock's frequency is determined.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ClockRate {
    /// A fixed frequency.
    Absolute(Frequency),
    /// `parent × multiplier / divider`, phase-aligned with the parent.
    Derived {
        /// The clock this one is derived from.
        parent: ClockId,
        /// Frequency multiplier.
        multiplier: u64,
        /// Frequency divider.
        divider: u64,
    },
}

/// How the reset input of registers in a domain behaves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ResetKind {
    /// Registers ignore their reset input.
    None,
    /// Reset is sampled on the active edge.
    #[default]
    Synchronous,
    /// Reset forces register outputs as soon as it is asserted.
    Asynchronous,
}

/// Reset behaviour of a clock domain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ResetPolicy {
    /// Synchronous, asynchronous or no reset.
    pub kind: ResetKind,
    /// Whether reset is asserted by a high level.
    pub active_high: bool,
    /// Whether registers hold their reset value at power-on rather than
    /// starting undefined.
    pub initialize_registers: bool,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            kind: ResetKind::Synchronous,
            active_high: true,
            initialize_registers: true,
        }
    }
}

impl ResetPolicy {
    /// Returns whether a reset level asserts reset under this policy.
    pub fn is_asserted(&self, level: bool) -> bool {
        level == self.active_high
    }
}

/// Parameters of a clock before it is added to a circuit.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ClockSpec {
    /// Active edge(s).
    pub trigger: TriggerEdge,
    /// Frequency or derivation.
    pub rate: ClockRate,
    /// Reset behaviour of the domain.
    pub reset: ResetPolicy,
}

impl ClockSpec {
    /// A rising-edge clock with the default reset policy.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            trigger: TriggerEdge::Rising,
            rate: ClockRate::Absolute(frequency),
            reset: ResetPolicy::default(),
        }
    }

    /// A rising-edge clock running at `parent × multiplier / divider`.
    pub fn derived(parent: ClockId, multiplier: u64, divider: u64) -> Self {
        Self {
            trigger: TriggerEdge::Rising,
            rate: ClockRate::Derived {
                parent,
                multiplier,
                divider,
            },
            reset: ResetPolicy::default(),
        }
    }

    /// Sets the active edge.
    pub fn with_trigger(mut self, trigger: TriggerEdge) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets the reset policy.
    pub fn with_reset(mut self, reset: ResetPolicy) -> Self {
        self.reset = reset;
        self
    }
}

/// A clock stored in a circuit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clock {
    /// Interned clock name.
    pub name: Ident,
    /// Active edge(s).
    pub trigger: TriggerEdge,
    /// Frequency or derivation.
    pub rate: ClockRate,
    /// Reset behaviour of the domain.
    pub reset: ResetPolicy,
}

impl Clock {
    pub(crate) fn new(name: Ident, spec: ClockSpec) -> Self {
        Self {
            name,
            trigger: spec.trigger,
            rate: spec.rate,
            reset: spec.reset,
        }
    }
}
