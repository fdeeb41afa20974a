//! Memory read/write timing and the conservative hazard policy.

mod common;

use common::*;
use tessera_common::BitState;
use tessera_ir::{
    ArithOp, Circuit, ClockId, MemoryConfig, MemoryInput, NodeId, NodeKind, ReadLatency,
};
use tessera_sim::{SimConfig, Simulation};

struct Ram {
    circuit: Circuit,
    clk: ClockId,
    mem: NodeId,
    we: NodeId,
    waddr: NodeId,
    wdata: NodeId,
    raddr: NodeId,
}

/// Eight bytes, word `i` initialized to `0x10 + i`, with every port driven
/// by an input.
fn ram(read: ReadLatency) -> Ram {
    let mut circuit = Circuit::new();
    let clk = clock(&mut circuit, "clk", mhz(1));
    let mut initial = 0u64;
    for word in 0..8u64 {
        initial |= (0x10 + word) << (8 * word);
    }
    let cfg = MemoryConfig::new(8, 8)
        .with_read(read)
        .with_initial(BitState::from_u64(initial, 64));
    let mem = circuit.add_node("mem", NodeKind::Memory(cfg));
    circuit.attach_clock(mem, 0, clk).unwrap();
    let we = input(&mut circuit, "we", 1);
    let waddr = input(&mut circuit, "waddr", 3);
    let wdata = input(&mut circuit, "wdata", 8);
    let raddr = input(&mut circuit, "raddr", 3);
    circuit.connect(we, mem, MemoryInput::WriteEnable.index()).unwrap();
    circuit.connect(waddr, mem, MemoryInput::WriteAddress.index()).unwrap();
    circuit.connect(wdata, mem, MemoryInput::WriteData.index()).unwrap();
    circuit.connect(raddr, mem, MemoryInput::ReadAddress.index()).unwrap();
    Ram {
        circuit,
        clk,
        mem,
        we,
        waddr,
        wdata,
        raddr,
    }
}

#[test]
fn same_cycle_hazard_reads_undefined_then_cell_updates() {
    let r = ram(ReadLatency::Asynchronous);
    let mut sim = Simulation::new(&r.circuit, SimConfig::default()).unwrap();
    sim.set_input(r.we, &bits("X")).unwrap();
    sim.set_input_u64(r.waddr, 2).unwrap();
    sim.set_input_u64(r.wdata, 0xAB).unwrap();
    sim.set_input_u64(r.raddr, 2).unwrap();
    sim.settle().unwrap();
    assert!(sim.read(r.mem).is_fully_undefined());

    // A different read address is not affected by the pending write.
    sim.set_input_u64(r.raddr, 5).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x15));

    // The uncertain write leaves the addressed cell undefined.
    sim.step().unwrap();
    sim.set_input_u64(r.we, 0).unwrap();
    sim.set_input_u64(r.raddr, 2).unwrap();
    sim.settle().unwrap();
    assert!(sim.read(r.mem).is_fully_undefined());

    // Once the enable resolves to 1 the cell takes the data.
    sim.set_input_u64(r.we, 1).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0xAB));
}

#[test]
fn read_before_write_within_a_cycle() {
    let r = ram(ReadLatency::Asynchronous);
    let mut sim = Simulation::new(&r.circuit, SimConfig::default()).unwrap();
    sim.set_input_u64(r.we, 1).unwrap();
    sim.set_input_u64(r.waddr, 3).unwrap();
    sim.set_input_u64(r.wdata, 0x99).unwrap();
    sim.set_input_u64(r.raddr, 3).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x13));
    sim.step().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x99));
}

#[test]
fn unknown_write_address_poisons_every_word() {
    let r = ram(ReadLatency::Asynchronous);
    let mut sim = Simulation::new(&r.circuit, SimConfig::default()).unwrap();
    sim.set_input_u64(r.we, 1).unwrap();
    sim.set_input(r.waddr, &bits("0X1")).unwrap();
    sim.set_input_u64(r.wdata, 0).unwrap();
    sim.set_input_u64(r.raddr, 6).unwrap();
    sim.step().unwrap();
    sim.set_input_u64(r.we, 0).unwrap();
    for addr in 0..8 {
        sim.set_input_u64(r.raddr, addr).unwrap();
        sim.settle().unwrap();
        assert!(sim.read(r.mem).is_fully_undefined(), "word {addr}");
    }
}

#[test]
fn synchronous_read_lags_one_edge() {
    let r = ram(ReadLatency::Synchronous);
    let mut sim = Simulation::new(&r.circuit, SimConfig::default()).unwrap();
    assert!(sim.read(r.mem).is_fully_undefined());
    sim.set_input_u64(r.we, 0).unwrap();
    sim.set_input_u64(r.raddr, 4).unwrap();
    sim.settle().unwrap();
    assert!(sim.read(r.mem).is_fully_undefined());
    sim.step().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x14));

    // Write and read the same word: the read returns the old contents.
    sim.set_input_u64(r.we, 1).unwrap();
    sim.set_input_u64(r.waddr, 4).unwrap();
    sim.set_input_u64(r.wdata, 0x44).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x14));
    sim.set_input_u64(r.we, 0).unwrap();
    sim.run_cycles(r.clk, 1).unwrap();
    assert_eq!(sim.read_u64(r.mem), Some(0x44));
}

/// `mem[addr] <= mem[addr] + 1`: the read port feeds the write data through
/// an adder, which only loops back through the write port.
#[test]
fn read_modify_write_through_asynchronous_read() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", mhz(1));
    let cfg = MemoryConfig::new(4, 8).with_initial(BitState::from_u64(0, 32));
    let mem = c.add_node("histogram", NodeKind::Memory(cfg));
    c.attach_clock(mem, 0, clk).unwrap();
    let we = input(&mut c, "we", 1);
    let addr = input(&mut c, "addr", 2);
    let one = constant(&mut c, "one", 1, 8);
    let inc = c.add_node(
        "inc",
        NodeKind::Arithmetic {
            op: ArithOp::Add,
            width: 8,
        },
    );
    c.connect(mem, inc, 0).unwrap();
    c.connect(one, inc, 1).unwrap();
    c.connect(we, mem, MemoryInput::WriteEnable.index()).unwrap();
    c.connect(addr, mem, MemoryInput::WriteAddress.index()).unwrap();
    c.connect(inc, mem, MemoryInput::WriteData.index()).unwrap();
    c.connect(addr, mem, MemoryInput::ReadAddress.index()).unwrap();

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    sim.set_input_u64(we, 1).unwrap();
    sim.set_input_u64(addr, 2).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.read_u64(mem), Some(0));
    assert_eq!(sim.read_u64(inc), Some(1));

    sim.run_cycles(clk, 3).unwrap();
    assert_eq!(sim.read_u64(mem), Some(3));
    assert_eq!(sim.read_u64(inc), Some(4));

    sim.set_input_u64(addr, 1).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.read_u64(mem), Some(1));

    sim.set_input_u64(we, 0).unwrap();
    sim.set_input_u64(addr, 2).unwrap();
    sim.run_cycles(clk, 2).unwrap();
    assert_eq!(sim.read_u64(mem), Some(3));
}

#[test]
fn memory_without_write_port_is_a_rom() {
    let mut c = Circuit::new();
    let clk = clock(&mut c, "clk", mhz(1));
    let cfg = MemoryConfig::new(4, 4).with_initial(BitState::from_u64(0xDCBA, 16));
    let rom = c.add_node("rom", NodeKind::Memory(cfg));
    c.attach_clock(rom, 0, clk).unwrap();
    let addr = input(&mut c, "addr", 2);
    c.connect(addr, rom, MemoryInput::ReadAddress.index()).unwrap();

    let mut sim = Simulation::new(&c, SimConfig::default()).unwrap();
    let mut words = Vec::new();
    for a in 0..4 {
        sim.set_input_u64(addr, a).unwrap();
        sim.step().unwrap();
        words.push(sim.read_u64(rom).unwrap());
    }
    assert_eq!(words, vec![0xA, 0xB, 0xC, 0xD]);
}
