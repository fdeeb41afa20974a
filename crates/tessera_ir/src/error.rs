//! Errors raised while building or checking a circuit.

/// Structural problems in a [`Circuit`](crate::Circuit).
///
/// Node and clock references are reported by name where one exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    /// A node ID does not belong to the circuit.
    #[error("node {0} does not exist")]
    UnknownNode(String),

    /// A clock ID does not belong to the circuit.
    #[error("clock {0} does not exist")]
    UnknownClock(String),

    /// A port index is past the end of a node's ports.
    #[error("node '{node}' has no {direction} port {port}")]
    NoSuchPort {
        /// Node name.
        node: String,
        /// `"input"`, `"output"` or `"clock"`.
        direction: &'static str,
        /// The offending index.
        port: u32,
    },

    /// An input already has a driver.
    #[error("input {input} of node '{node}' is already driven by {driver}")]
    InputAlreadyDriven {
        /// Node name.
        node: String,
        /// Input index.
        input: u32,
        /// The existing driver.
        driver: String,
    },

    /// A required input has no driver.
    #[error("input {input} of node '{node}' is not connected")]
    UnconnectedInput {
        /// Node name.
        node: String,
        /// Input index.
        input: u32,
    },

    /// A driver's width differs from what the input expects.
    #[error("input {input} of node '{node}' expects {expected} bits but is driven with {found}")]
    WidthMismatch {
        /// Node name.
        node: String,
        /// Input index.
        input: u32,
        /// Width the input requires.
        expected: u32,
        /// Width of the driver.
        found: u32,
    },

    /// A clock port has no clock bound.
    #[error("clock port {port} of node '{node}' is not bound to a clock")]
    UnboundClockPort {
        /// Node name.
        node: String,
        /// Clock port index.
        port: u32,
    },

    /// A node's parameters are inconsistent.
    #[error("invalid node '{node}': {reason}")]
    InvalidNode {
        /// Node name.
        node: String,
        /// What is wrong.
        reason: String,
    },

    /// A clock's parameters are inconsistent.
    #[error("invalid clock '{clock}': {reason}")]
    InvalidClock {
        /// Clock name.
        clock: String,
        /// What is wrong.
        reason: String,
    },

    /// Derived clocks refer back to themselves.
    #[error("clock '{0}' is derived from itself")]
    ClockCycle(String),
}
