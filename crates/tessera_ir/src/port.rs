//! Edge endpoints.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One output port of one node, used as the driver of an input.
///
/// A `NodePort` is a plain value and owns nothing; it stays meaningful only as
/// long as the circuit it was taken from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodePort {
    /// The node that owns the port.
    pub node: NodeId,
    /// Output index within that node.
    pub port: u32,
}

impl NodePort {
    /// Creates a port reference.
    pub fn new(node: NodeId, port: u32) -> Self {
        Self { node, port }
    }

    /// The first (and usually only) output of `node`.
    pub fn output(node: NodeId) -> Self {
        Self { node, port: 0 }
    }
}

impl From<NodeId> for NodePort {
    fn from(node: NodeId) -> Self {
        Self::output(node)
    }
}

impl fmt::Display for NodePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}
