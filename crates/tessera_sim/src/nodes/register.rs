//! Clocked registers.

use crate::behavior::{merge, NodeBehavior, OutputTiming, Slot};
use tessera_common::bit_state::chunks;
use tessera_common::{BitState, Logic, Plane};
use tessera_ir::{ResetKind, ResetPolicy};

/// Edge-triggered register with optional enable and reset.
///
/// `evaluate` computes the next value into an internal slot; `advance` makes
/// it visible. When enable or reset is undefined, every candidate outcome is
/// merged and only the bits on which they all agree stay defined.
pub struct Register {
    width: usize,
    reset_value: Option<BitState>,
    policy: ResetPolicy,
    has_enable: bool,
    has_reset: bool,
}

impl Register {
    /// Creates a register. `has_enable`/`has_reset` tell whether those inputs
    /// are driven.
    pub fn new(
        width: usize,
        reset_value: Option<BitState>,
        policy: ResetPolicy,
        has_enable: bool,
        has_reset: bool,
    ) -> Self {
        Self {
            width,
            reset_value,
            policy,
            has_enable,
            has_reset,
        }
    }

    /// The reset value, if the reset input can have any effect.
    fn active_reset_value(&self) -> Option<&BitState> {
        if self.policy.kind == ResetKind::None || !self.has_reset {
            return None;
        }
        self.reset_value.as_ref()
    }

    /// `Some(true)` if reset is asserted, `None` if that is unknown.
    fn reset_asserted(&self, state: &BitState, inputs: &[Slot]) -> Option<bool> {
        inputs[2]
            .logic(state, 0)
            .to_bool()
            .map(|level| self.policy.is_asserted(level))
    }
}

fn chunk_of(value: &BitState, at: usize, n: usize) -> (u64, u64) {
    (
        value.extract(Plane::Value, at, n),
        value.extract(Plane::Defined, at, n),
    )
}

impl NodeBehavior for Register {
    fn internal_sizes(&self) -> Vec<usize> {
        vec![self.width]
    }

    fn output_timing(&self) -> OutputTiming {
        if self.policy.kind == ResetKind::Asynchronous && self.active_reset_value().is_some() {
            OutputTiming::RegisteredAsyncReset
        } else {
            OutputTiming::Registered
        }
    }

    fn reset(&self, state: &mut BitState, internal: &[Slot], outputs: &[Slot]) {
        match &self.reset_value {
            Some(value) if self.policy.initialize_registers => outputs[0].write(state, value),
            _ => outputs[0].set_undefined(state),
        }
        internal[0].copy_from(state, outputs[0]);
    }

    fn evaluate(&self, state: &mut BitState, internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let (data, q, next) = (inputs[0], outputs[0], internal[0]);
        let enable = if self.has_enable {
            inputs[1].logic(state, 0)
        } else {
            Logic::One
        };
        let reset = self
            .active_reset_value()
            .map(|value| (value, self.reset_asserted(state, inputs)));
        let asynchronous = self.policy.kind == ResetKind::Asynchronous;

        for (at, n) in chunks(self.width) {
            let held = q.get_pair(state, at, n);
            let mut value = match enable {
                Logic::One => data.get_pair(state, at, n),
                Logic::Zero => held,
                Logic::Undefined => merge(data.get_pair(state, at, n), held),
            };
            if let Some((rst, asserted)) = reset {
                let rst = chunk_of(rst, at, n);
                match asserted {
                    Some(true) => value = rst,
                    Some(false) => {}
                    None => value = merge(rst, value),
                }
                if asynchronous {
                    match asserted {
                        Some(true) => q.set_pair(state, at, n, rst),
                        Some(false) => {}
                        None => q.set_pair(state, at, n, merge(rst, held)),
                    }
                }
            }
            next.set_pair(state, at, n, value);
        }
    }

    fn advance(&self, state: &mut BitState, internal: &[Slot], outputs: &[Slot], _clock_port: u32) {
        outputs[0].copy_from(state, internal[0]);
    }
}
