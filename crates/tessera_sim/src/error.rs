//! Error types for building and running a simulation.

use crate::time::SimTime;
use tessera_ir::IrError;

/// Errors that stop a simulation from being built or from continuing.
///
/// Structural problems are all reported while building, before any
/// simulated time elapses.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The circuit failed validation.
    #[error("invalid circuit: {0}")]
    Graph(#[from] IrError),

    /// Combinational nodes form a loop with no evaluation order.
    #[error("combinational cycle through node '{node}'")]
    CombinationalCycle {
        /// A node on the cycle.
        node: String,
    },

    /// Asynchronously reset outputs kept changing between settle passes.
    #[error("logic did not settle after {passes} passes at {time}")]
    SettleLimit {
        /// Number of passes run.
        passes: u32,
        /// Simulation time when the limit was hit.
        time: SimTime,
    },

    /// The configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A testbench write was rejected.
    #[error("cannot drive node '{node}': {reason}")]
    InvalidPoke {
        /// Target node.
        node: String,
        /// Why the write was rejected.
        reason: String,
    },
}

/// Errors raised while loading or applying a simulation configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A frequency override names a clock the circuit does not have.
    #[error("unknown clock '{0}'")]
    UnknownClock(String),

    /// A value is out of range or inconsistent.
    #[error("validation error: {0}")]
    ValidationError(String),
}
