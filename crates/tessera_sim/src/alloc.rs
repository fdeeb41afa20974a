//! Global storage layout for a simulation run.
//!
//! The allocator walks the finished circuit once and hands every node port and
//! internal slot a bit range in the single state vector. Inputs never get
//! storage of their own when connected: they read their driver's output range
//! directly. Outputs that merely forward an input share the storage of that
//! input's driver as well.

use crate::behavior::{NodeBehavior, Slot};
use tessera_common::WORD_BITS;
use tessera_ir::{Circuit, NodeId, NodePort};

/// Hands out bit ranges in increasing order.
///
/// Slots of up to 64 bits never straddle a storage word, so behaviors can use
/// the single-word fast paths on them. Wider slots start on a word boundary.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    next: usize,
}

impl SlotAllocator {
    /// Creates an allocator starting at bit 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `width` bits.
    pub fn alloc(&mut self, width: usize) -> Slot {
        let within = self.next % WORD_BITS;
        if within != 0 && (width > WORD_BITS || within + width > WORD_BITS) {
            self.next += WORD_BITS - within;
        }
        let slot = Slot::new(self.next, width);
        self.next += width;
        slot
    }

    /// Number of bits reserved so far.
    pub fn total_bits(&self) -> usize {
        self.next
    }
}

/// Slots of one node, in port order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeOffsets {
    /// One slot per input port.
    pub inputs: Vec<Slot>,
    /// One slot per output port.
    pub outputs: Vec<Slot>,
    /// One slot per internal state slot.
    pub internal: Vec<Slot>,
}

/// Offsets of every node, computed once before the first reset.
#[derive(Clone, Debug)]
pub struct OffsetTable {
    nodes: Vec<NodeOffsets>,
    total_bits: usize,
    shared_outputs: usize,
}

impl OffsetTable {
    /// Lays out storage for `circuit`.
    ///
    /// `order` must be a topological order of the combinational edges, so that
    /// a forwarding node's driver has its output placed before the forwarding
    /// node is visited.
    pub fn build(circuit: &Circuit, behaviors: &[Box<dyn NodeBehavior>], order: &[NodeId]) -> Self {
        let mut alloc = SlotAllocator::new();
        let mut outputs: Vec<Vec<Option<Slot>>> = Vec::with_capacity(circuit.node_count());
        let mut internal: Vec<Vec<Slot>> = Vec::with_capacity(circuit.node_count());

        for (id, node) in circuit.nodes() {
            let behavior = &behaviors[id.index()];
            let slots = node
                .kind
                .output_types()
                .iter()
                .enumerate()
                .map(|(port, ty)| {
                    let forwarded = behavior
                        .forwarded_input(port as u32)
                        .and_then(|input| node.driver(input));
                    match forwarded {
                        Some(_) => None,
                        None => Some(alloc.alloc(ty.width as usize)),
                    }
                })
                .collect();
            outputs.push(slots);
            internal.push(
                behavior
                    .internal_sizes()
                    .into_iter()
                    .map(|size| alloc.alloc(size))
                    .collect(),
            );
        }

        let mut shared_outputs = 0;
        for &id in order {
            let node = circuit.node(id);
            for port in 0..outputs[id.index()].len() {
                if outputs[id.index()][port].is_some() {
                    continue;
                }
                let source = behaviors[id.index()]
                    .forwarded_input(port as u32)
                    .and_then(|input| node.driver(input))
                    .and_then(|driver| outputs[driver.node.index()][driver.port as usize]);
                let slot = match source {
                    Some(slot) => {
                        shared_outputs += 1;
                        slot
                    }
                    None => {
                        let width = node.kind.output_types()[port].width;
                        alloc.alloc(width as usize)
                    }
                };
                outputs[id.index()][port] = Some(slot);
            }
        }

        let mut nodes = Vec::with_capacity(circuit.node_count());
        for ((id, node), (outs, internal)) in circuit.nodes().zip(outputs.iter().zip(internal)) {
            let inputs = (0..node.kind.input_count())
                .map(|input| {
                    node.driver(input)
                        .and_then(|driver| outputs[driver.node.index()][driver.port as usize])
                        .unwrap_or_else(|| alloc.alloc(node.kind.input_width(input) as usize))
                })
                .collect();
            debug_assert!(outs.iter().all(Option::is_some), "output of {id} not placed");
            nodes.push(NodeOffsets {
                inputs,
                outputs: outs.iter().flatten().copied().collect(),
                internal,
            });
        }

        Self {
            nodes,
            total_bits: alloc.total_bits(),
            shared_outputs,
        }
    }

    /// Slots of one node.
    pub fn node(&self, id: NodeId) -> &NodeOffsets {
        &self.nodes[id.index()]
    }

    /// Slot of an output port, if it exists.
    pub fn output(&self, port: NodePort) -> Option<Slot> {
        self.nodes
            .get(port.node.index())?
            .outputs
            .get(port.port as usize)
            .copied()
    }

    /// Slot read by an input port, if it exists.
    pub fn input(&self, node: NodeId, input: u32) -> Option<Slot> {
        self.nodes.get(node.index())?.inputs.get(input as usize).copied()
    }

    /// Size of the state vector.
    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    /// Number of outputs that share their driver's storage.
    pub fn shared_outputs(&self) -> usize {
        self.shared_outputs
    }
}
