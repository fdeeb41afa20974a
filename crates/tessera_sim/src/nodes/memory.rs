//! Memory arrays with a write port and a synchronous or asynchronous read
//! port.

use crate::behavior::{NodeBehavior, OutputTiming, Slot};
use tessera_common::{BitState, Logic};
use tessera_ir::{MemoryConfig, MemoryInput, ReadLatency};

const CELLS: usize = 0;
const WRITE_ENABLE: usize = 1;
const WRITE_ADDRESS: usize = 2;
const WRITE_DATA: usize = 3;
const READ_LATCH: usize = 4;

/// A word-addressed memory with one write port and one read port.
///
/// Writes are latched when an edge is sampled and land in the cell array on the
/// active edge. Reads see the contents from before that edge. Whenever a
/// same-cycle write could hit the read address and that cannot be ruled out,
/// the read word is undefined.
pub struct Memory {
    cfg: MemoryConfig,
    has_write_enable: bool,
}

impl Memory {
    /// Creates a memory. Without a driven write enable the memory is
    /// read-only.
    pub fn new(cfg: MemoryConfig, has_write_enable: bool) -> Self {
        Self {
            cfg,
            has_write_enable,
        }
    }

    fn width(&self) -> usize {
        self.cfg.width as usize
    }

    /// Word slot of a defined address, `None` when out of range.
    fn cell(&self, cells: Slot, address: u64) -> Option<Slot> {
        if address >= u64::from(self.cfg.depth) {
            return None;
        }
        Some(cells.sub(address as usize * self.width(), self.width()))
    }

    fn write_enable(&self, state: &BitState, inputs: &[Slot]) -> Logic {
        if self.has_write_enable {
            inputs[MemoryInput::WriteEnable.index() as usize].logic(state, 0)
        } else {
            Logic::Zero
        }
    }

    /// Computes the read word into `target`.
    fn read_into(&self, state: &mut BitState, internal: &[Slot], inputs: &[Slot], target: Slot) {
        let enable = self.write_enable(state, inputs);
        let write_address = inputs[MemoryInput::WriteAddress.index() as usize].read_u64(state);
        let read_address = inputs[MemoryInput::ReadAddress.index() as usize].read_u64(state);

        let Some(read_address) = read_address else {
            target.set_undefined(state);
            return;
        };
        let overlap_possible = enable != Logic::Zero
            && write_address.is_none_or(|address| address == read_address);
        let uncertain = enable == Logic::Undefined || write_address.is_none();
        match self.cell(internal[CELLS], read_address) {
            Some(cell) if !(overlap_possible && uncertain) => target.copy_from(state, cell),
            _ => target.set_undefined(state),
        }
    }
}

impl NodeBehavior for Memory {
    fn internal_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![
            self.cfg.bits(),
            1,
            self.cfg.address_width as usize,
            self.width(),
        ];
        if self.cfg.read == ReadLatency::Synchronous {
            sizes.push(self.width());
        }
        sizes
    }

    fn output_timing(&self) -> OutputTiming {
        match self.cfg.read {
            ReadLatency::Asynchronous => OutputTiming::Combinational,
            ReadLatency::Synchronous => OutputTiming::Registered,
        }
    }

    fn reset(&self, state: &mut BitState, internal: &[Slot], outputs: &[Slot]) {
        match &self.cfg.initial {
            Some(initial) => internal[CELLS].write(state, initial),
            None => internal[CELLS].set_undefined(state),
        }
        state.set_logic(internal[WRITE_ENABLE].offset, Logic::Zero);
        internal[WRITE_ADDRESS].set_undefined(state);
        internal[WRITE_DATA].set_undefined(state);
        if let Some(latch) = internal.get(READ_LATCH) {
            latch.set_undefined(state);
        }
        outputs[0].set_undefined(state);
    }

    fn combinational_input(&self, input: u32) -> bool {
        input != MemoryInput::WriteData.index()
    }

    fn evaluate(&self, state: &mut BitState, internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let target = internal.get(READ_LATCH).copied().unwrap_or(outputs[0]);
        self.read_into(state, internal, inputs, target);
    }

    fn sample(&self, state: &mut BitState, internal: &[Slot], inputs: &[Slot]) {
        let enable = self.write_enable(state, inputs);
        state.set_logic(internal[WRITE_ENABLE].offset, enable);
        internal[WRITE_ADDRESS].copy_from(state, inputs[MemoryInput::WriteAddress.index() as usize]);
        internal[WRITE_DATA].copy_from(state, inputs[MemoryInput::WriteData.index() as usize]);
    }

    fn advance(&self, state: &mut BitState, internal: &[Slot], outputs: &[Slot], _clock_port: u32) {
        let cells = internal[CELLS];
        let enable = internal[WRITE_ENABLE].logic(state, 0);
        if enable != Logic::Zero {
            match internal[WRITE_ADDRESS].read_u64(state) {
                Some(address) => {
                    if let Some(cell) = self.cell(cells, address) {
                        match enable {
                            Logic::One => cell.copy_from(state, internal[WRITE_DATA]),
                            _ => cell.set_undefined(state),
                        }
                    }
                }
                None => cells.set_undefined(state),
            }
        }
        if let Some(latch) = internal.get(READ_LATCH) {
            outputs[0].copy_from(state, *latch);
        }
    }
}
