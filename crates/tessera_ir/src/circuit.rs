//! The circuit graph and its construction API.

use crate::arena::Arena;
use crate::clock::{Clock, ClockRate, ClockSpec};
use crate::connection::ConnectionType;
use crate::error::IrError;
use crate::ids::{ClockId, NodeId};
use crate::kind::NodeKind;
use crate::node::Node;
use crate::port::NodePort;
use std::collections::HashMap;
use tessera_common::{Frequency, Interner};

/// A finished or in-progress circuit: nodes, clocks and the edges between
/// them.
///
/// Edges live on the consumer side as `Option<NodePort>` per input, so "at most
/// one driver per input" holds by construction. Call [`validate`](Self::validate)
/// once building is complete; the simulator does so itself before allocating
/// storage.
#[derive(Debug, Default)]
pub struct Circuit {
    interner: Interner,
    nodes: Arena<NodeId, Node>,
    clocks: Arena<ClockId, Clock>,
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clock and returns its ID.
    pub fn add_clock(&mut self, name: &str, spec: ClockSpec) -> ClockId {
        let name = self.interner.get_or_intern(name);
        self.clocks.alloc(Clock::new(name, spec))
    }

    /// Adds an unconnected node and returns its ID.
    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        let name = self.interner.get_or_intern(name);
        self.nodes.alloc(Node::new(name, kind))
    }

    /// Drives `input` of `node` from `driver`.
    ///
    /// Widths are checked by [`validate`](Self::validate), not here.
    pub fn connect(
        &mut self,
        driver: impl Into<NodePort>,
        node: NodeId,
        input: u32,
    ) -> Result<(), IrError> {
        let driver = driver.into();
        let outputs = self.try_node(driver.node)?.output_count();
        if driver.port >= outputs {
            return Err(self.no_such_port(driver.node, "output", driver.port));
        }
        self.check_input(node, input)?;
        if let Some(existing) = self.nodes[node].driver(input) {
            return Err(IrError::InputAlreadyDriven {
                node: self.name(node).to_string(),
                input,
                driver: existing.to_string(),
            });
        }
        self.nodes[node].inputs[input as usize] = Some(driver);
        Ok(())
    }

    /// Removes the driver of `input`, returning it.
    pub fn disconnect(&mut self, node: NodeId, input: u32) -> Result<Option<NodePort>, IrError> {
        self.check_input(node, input)?;
        Ok(self.nodes[node].inputs[input as usize].take())
    }

    /// Binds clock port `port` of `node` to `clock`, replacing any previous
    /// binding.
    pub fn attach_clock(&mut self, node: NodeId, port: u32, clock: ClockId) -> Result<(), IrError> {
        if !self.clocks.contains(clock) {
            return Err(IrError::UnknownClock(clock.to_string()));
        }
        if port >= self.try_node(node)?.kind.clock_ports() {
            return Err(self.no_such_port(node, "clock", port));
        }
        self.nodes[node].clocks[port as usize] = Some(clock);
        Ok(())
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a node of this circuit.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Iterates over all nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a clock.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a clock of this circuit.
    pub fn clock(&self, id: ClockId) -> &Clock {
        &self.clocks[id]
    }

    /// Iterates over all clocks in creation order.
    pub fn clocks(&self) -> impl Iterator<Item = (ClockId, &Clock)> {
        self.clocks.iter()
    }

    /// Number of clocks.
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    /// The name of a node.
    pub fn name(&self, id: NodeId) -> &str {
        self.interner.resolve(self.nodes[id].name)
    }

    /// The name of a clock.
    pub fn clock_name(&self, id: ClockId) -> &str {
        self.interner.resolve(self.clocks[id].name)
    }

    /// Finds the first node called `name`.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        let ident = self.interner.get(name)?;
        self.nodes
            .iter()
            .find(|(_, node)| node.name == ident)
            .map(|(id, _)| id)
    }

    /// Finds the first clock called `name`.
    pub fn find_clock(&self, name: &str) -> Option<ClockId> {
        let ident = self.interner.get(name)?;
        self.clocks
            .iter()
            .find(|(_, clock)| clock.name == ident)
            .map(|(id, _)| id)
    }

    /// The driver of an input, if connected.
    pub fn driver(&self, node: NodeId, input: u32) -> Option<NodePort> {
        self.nodes.try_get(node)?.driver(input)
    }

    /// Every `(node, input)` driven by `port`.
    pub fn consumers(&self, port: NodePort) -> Vec<(NodeId, u32)> {
        self.nodes
            .iter()
            .flat_map(|(id, node)| {
                node.inputs
                    .iter()
                    .enumerate()
                    .filter(move |(_, driver)| **driver == Some(port))
                    .map(move |(input, _)| (id, input as u32))
            })
            .collect()
    }

    /// The shape of an output port.
    pub fn output_type(&self, port: NodePort) -> Option<ConnectionType> {
        self.nodes
            .try_get(port.node)?
            .kind
            .output_types()
            .get(port.port as usize)
            .copied()
    }

    /// Resolves the frequency of `clock`, following derivations.
    ///
    /// `overrides` replaces the frequency of absolute clocks; derived clocks
    /// follow their (possibly overridden) parent.
    pub fn resolve_frequency(
        &self,
        clock: ClockId,
        overrides: &HashMap<ClockId, Frequency>,
    ) -> Result<Frequency, IrError> {
        let mut factors = Vec::new();
        let mut current = clock;
        loop {
            let decl = self
                .clocks
                .try_get(current)
                .ok_or_else(|| IrError::UnknownClock(current.to_string()))?;
            match decl.rate {
                ClockRate::Absolute(f) => {
                    let mut freq = overrides.get(&current).copied().unwrap_or(f);
                    for (id, mul, div) in factors.into_iter().rev() {
                        freq = freq.scaled(mul, div).ok_or_else(|| IrError::InvalidClock {
                            clock: self.clock_name(id).to_string(),
                            reason: format!("cannot scale {freq} by {mul}/{div}"),
                        })?;
                    }
                    return Ok(freq);
                }
                ClockRate::Derived {
                    parent,
                    multiplier,
                    divider,
                } => {
                    factors.push((current, multiplier, divider));
                    if factors.len() > self.clocks.len() {
                        return Err(IrError::ClockCycle(self.clock_name(clock).to_string()));
                    }
                    current = parent;
                }
            }
        }
    }

    /// Checks the whole circuit.
    ///
    /// Reports the first problem found: invalid clock or node parameters,
    /// derived-clock cycles, missing required drivers, width mismatches and
    /// unbound clock ports.
    pub fn validate(&self) -> Result<(), IrError> {
        let no_overrides = HashMap::new();
        for (id, clock) in self.clocks.iter() {
            if let ClockRate::Derived {
                parent,
                multiplier,
                divider,
            } = clock.rate
            {
                if !self.clocks.contains(parent) {
                    return Err(IrError::UnknownClock(parent.to_string()));
                }
                if multiplier == 0 || divider == 0 {
                    return Err(IrError::InvalidClock {
                        clock: self.clock_name(id).to_string(),
                        reason: "multiplier and divider must be non-zero".to_string(),
                    });
                }
            }
            self.resolve_frequency(id, &no_overrides)?;
        }

        for (id, node) in self.nodes.iter() {
            node.kind.check().map_err(|reason| IrError::InvalidNode {
                node: self.name(id).to_string(),
                reason,
            })?;
            for (input, driver) in node.inputs.iter().enumerate() {
                let input = input as u32;
                match driver {
                    Some(driver) => {
                        let ty = self
                            .output_type(*driver)
                            .ok_or_else(|| IrError::UnknownNode(driver.to_string()))?;
                        let expected = node.kind.input_width(input);
                        if !ty.is_connected() || ty.width != expected {
                            return Err(IrError::WidthMismatch {
                                node: self.name(id).to_string(),
                                input,
                                expected,
                                found: ty.width,
                            });
                        }
                    }
                    None if node.kind.is_optional_input(input) => {}
                    None => {
                        return Err(IrError::UnconnectedInput {
                            node: self.name(id).to_string(),
                            input,
                        })
                    }
                }
            }
            for (port, clock) in node.clocks.iter().enumerate() {
                match clock {
                    Some(clock) if !self.clocks.contains(*clock) => {
                        return Err(IrError::UnknownClock(clock.to_string()))
                    }
                    Some(_) => {}
                    None => {
                        return Err(IrError::UnboundClockPort {
                            node: self.name(id).to_string(),
                            port: port as u32,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn try_node(&self, id: NodeId) -> Result<&Node, IrError> {
        self.nodes
            .try_get(id)
            .ok_or_else(|| IrError::UnknownNode(id.to_string()))
    }

    fn check_input(&self, node: NodeId, input: u32) -> Result<(), IrError> {
        if input >= self.try_node(node)?.kind.input_count() {
            return Err(self.no_such_port(node, "input", input));
        }
        Ok(())
    }

    fn no_such_port(&self, node: NodeId, direction: &'static str, port: u32) -> IrError {
        IrError::NoSuchPort {
            node: self.name(node).to_string(),
            direction,
            port,
        }
    }
}
