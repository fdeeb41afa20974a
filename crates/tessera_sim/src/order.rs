//! Evaluation order and per-domain settle cones.
//!
//! Ordering edges follow combinational outputs only: an edge from a
//! registered output is a value from the previous cycle, so loops through
//! registers are legal while a purely combinational loop is rejected before
//! simulation starts.

use crate::behavior::{NodeBehavior, OutputTiming};
use crate::error::SimError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;
use tessera_ir::{Circuit, ClockId, NodeId};

/// A set of nodes to evaluate, in topological order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cone {
    /// Nodes in evaluation order.
    pub nodes: Vec<NodeId>,
    /// Nodes of the cone whose registered outputs may also change during
    /// evaluate. A settle pass is repeated while any of them changes.
    pub late_writers: Vec<NodeId>,
}

impl Cone {
    /// Returns true if the cone has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Cached topological order plus the cones every clock domain settles.
#[derive(Clone, Debug)]
pub struct EvaluationOrder {
    position: Vec<usize>,
    timing: Vec<OutputTiming>,
    full: Cone,
    fan_in: Vec<Cone>,
    fan_out: Vec<Cone>,
    members: Vec<Vec<(NodeId, u32)>>,
}

impl EvaluationOrder {
    /// Orders the nodes of `circuit` and computes the cones of every clock.
    pub fn build(circuit: &Circuit, behaviors: &[Box<dyn NodeBehavior>]) -> Result<Self, SimError> {
        let timing: Vec<OutputTiming> = behaviors.iter().map(|b| b.output_timing()).collect();

        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(circuit.node_count(), 0);
        for (id, _) in circuit.nodes() {
            graph.add_node(id);
        }
        let mut drivers: Vec<Vec<NodeId>> = vec![Vec::new(); circuit.node_count()];
        let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); circuit.node_count()];
        for (id, node) in circuit.nodes() {
            let behavior = &behaviors[id.index()];
            for (port, driver) in node.inputs().iter().enumerate() {
                let Some(driver) = driver else { continue };
                if !drivers[id.index()].contains(&driver.node) {
                    drivers[id.index()].push(driver.node);
                    consumers[driver.node.index()].push(id);
                }
                if timing[driver.node.index()] == OutputTiming::Combinational
                    && behavior.combinational_input(port as u32)
                {
                    graph.add_edge(
                        NodeIndex::new(driver.node.index()),
                        NodeIndex::new(id.index()),
                        (),
                    );
                }
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| SimError::CombinationalCycle {
            node: circuit.name(graph[cycle.node_id()]).to_string(),
        })?;
        let order: Vec<NodeId> = sorted.into_iter().map(|ix| graph[ix]).collect();
        let mut position = vec![0; order.len()];
        for (pos, id) in order.iter().enumerate() {
            position[id.index()] = pos;
        }

        let mut members: Vec<Vec<(NodeId, u32)>> = vec![Vec::new(); circuit.clock_count()];
        for (id, node) in circuit.nodes() {
            for (port, clock) in node.clocks().iter().enumerate() {
                if let Some(clock) = clock {
                    members[clock.index()].push((id, port as u32));
                }
            }
        }

        let mut this = Self {
            position,
            timing,
            full: Cone::default(),
            fan_in: Vec::new(),
            fan_out: Vec::new(),
            members,
        };
        this.full = this.cone(order.iter().copied());
        for clock in 0..circuit.clock_count() {
            let starts: Vec<NodeId> = this.members[clock].iter().map(|(id, _)| *id).collect();
            let fan_in = this.reach(&starts, &drivers);
            let fan_out = this.reach(&starts, &consumers);
            this.fan_in.push(fan_in);
            this.fan_out.push(fan_out);
        }
        Ok(this)
    }

    /// Every node, in evaluation order.
    pub fn full(&self) -> &Cone {
        &self.full
    }

    /// Nodes to settle before the domain of `clock` advances: its clocked
    /// nodes and everything they combinationally depend on.
    pub fn fan_in(&self, clock: ClockId) -> &Cone {
        &self.fan_in[clock.index()]
    }

    /// Nodes to settle after the domain of `clock` advanced: its clocked nodes
    /// and everything their outputs combinationally reach.
    pub fn fan_out(&self, clock: ClockId) -> &Cone {
        &self.fan_out[clock.index()]
    }

    /// `(node, clock port)` pairs bound to `clock`.
    pub fn members(&self, clock: ClockId) -> &[(NodeId, u32)] {
        &self.members[clock.index()]
    }

    /// Unites several cones, keeping evaluation order.
    pub fn merge<'a>(&self, cones: impl IntoIterator<Item = &'a Cone>) -> Cone {
        let mut nodes: Vec<NodeId> = cones.into_iter().flat_map(|c| c.nodes.iter().copied()).collect();
        nodes.sort_unstable_by_key(|id| self.position[id.index()]);
        nodes.dedup();
        self.cone(nodes)
    }

    /// Position of `node` in the evaluation order.
    pub fn position(&self, node: NodeId) -> usize {
        self.position[node.index()]
    }

    /// Walks `edges` from `starts`. Registered nodes are included but not
    /// walked through, since evaluating them cannot change their outputs.
    fn reach(&self, starts: &[NodeId], edges: &[Vec<NodeId>]) -> Cone {
        let mut seen = vec![false; self.position.len()];
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut found = Vec::new();
        for &start in starts {
            if !seen[start.index()] {
                seen[start.index()] = true;
                found.push(start);
                queue.push_back(start);
            }
        }
        while let Some(id) = queue.pop_front() {
            for &next in &edges[id.index()] {
                if seen[next.index()] {
                    continue;
                }
                seen[next.index()] = true;
                found.push(next);
                if self.timing[next.index()] != OutputTiming::Registered {
                    queue.push_back(next);
                }
            }
        }
        found.sort_unstable_by_key(|id| self.position[id.index()]);
        self.cone(found)
    }

    fn cone(&self, nodes: impl IntoIterator<Item = NodeId>) -> Cone {
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        let late_writers = nodes
            .iter()
            .copied()
            .filter(|id| self.timing[id.index()] == OutputTiming::RegisteredAsyncReset)
            .collect();
        Cone {
            nodes,
            late_writers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::behavior_for;
    use tessera_common::{BitState, Frequency};
    use tessera_ir::{
        ArithOp, ClockSpec, ConnectionType, Interpretation, LogicOp, NodeKind, RegisterInput,
        ResetKind, ResetPolicy,
    };

    fn behaviors(c: &Circuit) -> Vec<Box<dyn NodeBehavior>> {
        c.nodes().map(|(id, _)| behavior_for(c, id)).collect()
    }

    fn not(c: &mut Circuit, name: &str, width: u32) -> NodeId {
        c.add_node(name, NodeKind::Logic { op: LogicOp::Not, width })
    }

    #[test]
    fn drivers_come_first() {
        let mut c = Circuit::new();
        let late = not(&mut c, "late", 2);
        let early = not(&mut c, "early", 2);
        let a = c.add_node(
            "a",
            NodeKind::Input {
                ty: ConnectionType::raw(2),
                initial: None,
            },
        );
        c.connect(a, early, 0).unwrap();
        c.connect(early, late, 0).unwrap();
        let order = EvaluationOrder::build(&c, &behaviors(&c)).unwrap();
        assert!(order.position(early) < order.position(late));
        assert_eq!(order.full().nodes.len(), 3);
        assert!(order.full().late_writers.is_empty());
    }

    fn register(c: &mut Circuit, name: &str, clock: ClockId) -> NodeId {
        let id = c.add_node(
            name,
            NodeKind::Register {
                width: 4,
                reset_value: Some(BitState::from_u64(0, 4)),
            },
        );
        c.attach_clock(id, 0, clock).unwrap();
        id
    }

    /// `q` counts on `clk`, `r` samples it on `other` and feeds `g`, and `s`
    /// samples `g` with an asynchronous reset.
    #[test]
    fn cones_stop_at_registers() {
        let mut c = Circuit::new();
        let clk = c.add_clock("clk", ClockSpec::new(Frequency::from_hz(10)));
        let other = c.add_clock("other", ClockSpec::new(Frequency::from_hz(3)));
        let slow = c.add_clock(
            "slow",
            ClockSpec::new(Frequency::from_hz(1)).with_reset(ResetPolicy {
                kind: ResetKind::Asynchronous,
                ..ResetPolicy::default()
            }),
        );
        let q = register(&mut c, "q", clk);
        let one = c.add_node(
            "one",
            NodeKind::Constant {
                value: BitState::from_u64(1, 4),
                interpretation: Interpretation::Unsigned,
            },
        );
        let inc = c.add_node(
            "inc",
            NodeKind::Arithmetic {
                op: ArithOp::Add,
                width: 4,
            },
        );
        let r = register(&mut c, "r", other);
        let g = not(&mut c, "g", 4);
        let s = register(&mut c, "s", slow);
        let rst = c.add_node(
            "rst",
            NodeKind::Input {
                ty: ConnectionType::bool(),
                initial: None,
            },
        );
        c.connect(q, inc, 0).unwrap();
        c.connect(one, inc, 1).unwrap();
        c.connect(inc, q, RegisterInput::Data.index()).unwrap();
        c.connect(q, r, RegisterInput::Data.index()).unwrap();
        c.connect(r, g, 0).unwrap();
        c.connect(g, s, RegisterInput::Data.index()).unwrap();
        c.connect(rst, s, RegisterInput::Reset.index()).unwrap();
        c.validate().unwrap();

        let order = EvaluationOrder::build(&c, &behaviors(&c)).unwrap();
        assert_eq!(order.members(clk), &[(q, 0)]);

        let fan_in = &order.fan_in(clk).nodes;
        assert!(fan_in.contains(&q) && fan_in.contains(&inc) && fan_in.contains(&one));
        assert!(!fan_in.contains(&r));

        // `r` is registered: it is refreshed but its consumer `g` is not.
        let fan_out = &order.fan_out(clk).nodes;
        assert!(fan_out.contains(&q) && fan_out.contains(&inc) && fan_out.contains(&r));
        assert!(!fan_out.contains(&g));

        let fan_out = order.fan_out(other);
        assert_eq!(fan_out.nodes.len(), 3);
        assert!([r, g, s].iter().all(|id| fan_out.nodes.contains(id)));
        assert_eq!(fan_out.late_writers, vec![s]);
        assert_eq!(order.fan_in(slow).late_writers, vec![s]);

        let merged = order.merge([order.fan_in(clk), order.fan_out(other)]);
        let positions: Vec<usize> = merged.nodes.iter().map(|&id| order.position(id)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(merged.nodes.len(), 6);
    }

    #[test]
    fn combinational_cycle_names_a_node() {
        let mut c = Circuit::new();
        let a = not(&mut c, "a", 1);
        let b = not(&mut c, "b", 1);
        c.connect(a, b, 0).unwrap();
        c.connect(b, a, 0).unwrap();
        let err = EvaluationOrder::build(&c, &behaviors(&c)).unwrap_err();
        assert!(matches!(err, SimError::CombinationalCycle { .. }));
    }
}
