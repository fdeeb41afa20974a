//! Graph vertices.

use crate::ids::ClockId;
use crate::kind::NodeKind;
use crate::port::NodePort;
use serde::{Deserialize, Serialize};
use tessera_common::Ident;

/// One vertex of a circuit: a named [`NodeKind`] plus its input drivers and
/// clock bindings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Interned node name.
    pub name: Ident,
    /// What the node does.
    pub kind: NodeKind,
    pub(crate) inputs: Vec<Option<NodePort>>,
    pub(crate) clocks: Vec<Option<ClockId>>,
}

impl Node {
    pub(crate) fn new(name: Ident, kind: NodeKind) -> Self {
        let inputs = vec![None; kind.input_count() as usize];
        let clocks = vec![None; kind.clock_ports() as usize];
        Self {
            name,
            kind,
            inputs,
            clocks,
        }
    }

    /// The driver of every input, in port order.
    pub fn inputs(&self) -> &[Option<NodePort>] {
        &self.inputs
    }

    /// The driver of one input, if connected.
    pub fn driver(&self, input: u32) -> Option<NodePort> {
        self.inputs.get(input as usize).copied().flatten()
    }

    /// The clock bound to every clock port, in port order.
    pub fn clocks(&self) -> &[Option<ClockId>] {
        &self.clocks
    }

    /// The clock bound to one clock port, if any.
    pub fn clock(&self, port: u32) -> Option<ClockId> {
        self.clocks.get(port as usize).copied().flatten()
    }

    /// Number of output ports.
    pub fn output_count(&self) -> u32 {
        self.kind.output_types().len() as u32
    }
}
