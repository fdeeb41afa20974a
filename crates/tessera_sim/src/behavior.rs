//! The per-node simulation contract.
//!
//! Every node is simulated by a [`NodeBehavior`]. Behaviors hold no signal
//! state themselves: all bits live in the simulation's [`BitState`], and a
//! behavior sees only the [`Slot`]s the allocator reserved for its inputs,
//! outputs and internal state, for the duration of one callback.

use std::ops::Range;
use tessera_common::bit_state::chunks;
use tessera_common::{BitState, Logic, Plane, WORD_BITS};

/// A contiguous range of bits in the state vector.
///
/// All accessors take offsets relative to the slot and panic if they reach
/// outside it, so a behavior that writes past its declared widths fails
/// immediately instead of corrupting a neighbour.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Slot {
    /// First bit in the state vector.
    pub offset: usize,
    /// Number of bits.
    pub width: usize,
}

impl Slot {
    /// Creates a slot.
    pub fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// The absolute bit range covered.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }

    /// A sub-range of this slot.
    pub fn sub(&self, at: usize, width: usize) -> Slot {
        self.check(at, width);
        Slot::new(self.offset + at, width)
    }

    /// Returns true if the slot lies within one storage word.
    pub fn fits_word(&self) -> bool {
        self.offset % WORD_BITS + self.width <= WORD_BITS
    }

    /// Reads up to 64 bits of one plane starting `at` bits into the slot.
    pub fn get(&self, state: &BitState, plane: Plane, at: usize, len: usize) -> u64 {
        self.check(at, len);
        if self.fits_word() {
            state.extract_non_straddling(plane, self.offset + at, len)
        } else {
            state.extract(plane, self.offset + at, len)
        }
    }

    /// Writes up to 64 bits of one plane starting `at` bits into the slot.
    pub fn set(&self, state: &mut BitState, plane: Plane, at: usize, len: usize, value: u64) {
        self.check(at, len);
        if self.fits_word() {
            state.insert_non_straddling(plane, self.offset + at, len, value);
        } else {
            state.insert(plane, self.offset + at, len, value);
        }
    }

    /// Reads both planes of a chunk as `(value, defined)`.
    pub fn get_pair(&self, state: &BitState, at: usize, len: usize) -> (u64, u64) {
        (
            self.get(state, Plane::Value, at, len),
            self.get(state, Plane::Defined, at, len),
        )
    }

    /// Writes both planes of a chunk. VALUE bits are cleared wherever the
    /// bit is undefined.
    pub fn set_pair(&self, state: &mut BitState, at: usize, len: usize, (value, defined): (u64, u64)) {
        self.set(state, Plane::Value, at, len, value & defined);
        self.set(state, Plane::Defined, at, len, defined);
    }

    /// Returns true if every bit is defined.
    pub fn all_defined(&self, state: &BitState) -> bool {
        if self.fits_word() {
            state.all_defined_non_straddling(self.offset, self.width)
        } else {
            state.all_defined(self.offset, self.width)
        }
    }

    /// Reads one bit.
    pub fn logic(&self, state: &BitState, bit: usize) -> Logic {
        self.check(bit, 1);
        state.logic(self.offset + bit)
    }

    /// Reads the slot as an integer if it is at most 64 bits wide and fully
    /// defined.
    pub fn read_u64(&self, state: &BitState) -> Option<u64> {
        if self.width > WORD_BITS || !self.all_defined(state) {
            return None;
        }
        Some(self.get(state, Plane::Value, 0, self.width))
    }

    /// Copies the slot out of the state vector.
    pub fn read(&self, state: &BitState) -> BitState {
        state.slice(self.offset, self.width)
    }

    /// Overwrites the slot with `value`, which must have the slot's width.
    pub fn write(&self, state: &mut BitState, value: &BitState) {
        assert_eq!(
            value.len(),
            self.width,
            "writing {} bits into a slot of {} bits",
            value.len(),
            self.width
        );
        for (at, n) in chunks(self.width) {
            let bits = (value.extract(Plane::Value, at, n), value.extract(Plane::Defined, at, n));
            self.set_pair(state, at, n, bits);
        }
    }

    /// Copies the bits of another slot of the same width into this one.
    pub fn copy_from(&self, state: &mut BitState, src: Slot) {
        assert_eq!(
            src.width, self.width,
            "copying {} bits into a slot of {} bits",
            src.width, self.width
        );
        if src.offset != self.offset {
            state.copy_range_within(self.offset, src.offset, self.width);
        }
    }

    /// Marks every bit undefined.
    pub fn set_undefined(&self, state: &mut BitState) {
        state.fill(self.offset, self.width, Logic::Undefined);
    }

    fn check(&self, at: usize, len: usize) {
        assert!(
            at + len <= self.width,
            "access {at}+{len} outside slot of {} bits",
            self.width
        );
    }
}

/// When a node's outputs may change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OutputTiming {
    /// Outputs are recomputed by `evaluate`. Consumers must be evaluated after
    /// the node.
    Combinational,
    /// Outputs change only in `reset` and `advance`; they break combinational
    /// ordering and feedback loops.
    Registered,
    /// Like [`Registered`](Self::Registered), but `evaluate` may also force
    /// the outputs (asynchronous reset). The scheduler repeats a settle pass
    /// when such an output changes.
    RegisteredAsyncReset,
}

/// The reset / evaluate / advance contract every simulated node implements.
///
/// Slices passed to the callbacks are in port order. `internal` holds the
/// slots sized by [`internal_sizes`](Self::internal_sizes).
pub trait NodeBehavior {
    /// Sizes of the internal state slots the node needs across edges.
    fn internal_sizes(&self) -> Vec<usize> {
        Vec::new()
    }

    /// When the outputs may change.
    fn output_timing(&self) -> OutputTiming {
        OutputTiming::Combinational
    }

    /// Whether the combinational outputs depend on input `input`. Inputs for
    /// which this is false are only consumed by [`sample`](Self::sample)
    /// and add no ordering edge.
    fn combinational_input(&self, _input: u32) -> bool {
        true
    }

    /// If output `port` simply forwards an input, the index of that input.
    /// The allocator then lets the output share the driver's storage.
    fn forwarded_input(&self, _output: u32) -> Option<u32> {
        None
    }

    /// Establishes the power-on state of outputs and internal slots.
    fn reset(&self, state: &mut BitState, internal: &[Slot], outputs: &[Slot]);

    /// Recomputes outputs and latched internal bits from the inputs.
    ///
    /// Must be idempotent for unchanged inputs and must not write to input
    /// slots.
    fn evaluate(&self, state: &mut BitState, internal: &[Slot], inputs: &[Slot], outputs: &[Slot]);

    /// Latches the inputs an edge will consume. Called on every node bound to
    /// an active clock once the pre-edge state has settled and before any
    /// node advances.
    fn sample(&self, _state: &mut BitState, _internal: &[Slot], _inputs: &[Slot]) {}

    /// Commits latched state on an active edge of the clock bound to
    /// `clock_port`.
    fn advance(&self, _state: &mut BitState, _internal: &[Slot], _outputs: &[Slot], _clock_port: u32) {}
}

/// Keeps only the bits on which two candidate values agree and are both
/// defined.
pub fn merge((av, ad): (u64, u64), (bv, bd): (u64, u64)) -> (u64, u64) {
    let defined = ad & bd & !(av ^ bv);
    (av & defined, defined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_roundtrip_inside_word() {
        let mut state = BitState::with_len(128);
        let slot = Slot::new(10, 8);
        assert!(slot.fits_word());
        slot.write(&mut state, &BitState::from_u64(0xA5, 8));
        assert_eq!(slot.read_u64(&state), Some(0xA5));
        assert_eq!(slot.logic(&state, 0), Logic::One);
        slot.set_undefined(&mut state);
        assert_eq!(slot.read_u64(&state), None);
    }

    #[test]
    fn slot_across_words() {
        let mut state = BitState::with_len(256);
        let slot = Slot::new(60, 100);
        assert!(!slot.fits_word());
        let mut value = BitState::with_len(100);
        for i in 0..100 {
            let bit = match i % 3 {
                0 => Logic::One,
                1 => Logic::Zero,
                _ => Logic::Undefined,
            };
            value.set_logic(i, bit);
        }
        slot.write(&mut state, &value);
        assert_eq!(slot.read(&state), value);
        assert!(!slot.all_defined(&state));
    }

    #[test]
    fn copy_between_slots() {
        let mut state = BitState::with_len(64);
        let a = Slot::new(0, 4);
        let b = Slot::new(8, 4);
        a.write(&mut state, &BitState::from_u64(0b1001, 4));
        b.copy_from(&mut state, a);
        assert_eq!(b.read_u64(&state), Some(0b1001));
    }

    #[test]
    #[should_panic(expected = "outside slot")]
    fn access_past_slot_panics() {
        let mut state = BitState::with_len(64);
        Slot::new(0, 4).set(&mut state, Plane::Value, 2, 3, 0);
    }

    #[test]
    #[should_panic(expected = "writing 5 bits into a slot of 4 bits")]
    fn oversized_write_panics() {
        let mut state = BitState::with_len(64);
        Slot::new(0, 4).write(&mut state, &BitState::from_u64(0, 5));
    }

    #[test]
    fn merge_keeps_agreeing_bits() {
        let (v, d) = merge((0b1100, 0b1111), (0b1010, 0b0111));
        assert_eq!(d, 0b0001);
        assert_eq!(v, 0b0000);
        let (v, d) = merge((0b1, 0b1), (0b1, 0b1));
        assert_eq!((v, d), (1, 1));
    }
}
