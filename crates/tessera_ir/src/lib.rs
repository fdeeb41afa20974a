//! Circuit graph intermediate representation consumed by the Tessera
//! simulator.
//!
//! A [`Circuit`] owns an arena of [`Node`]s and an arena of [`Clock`]s. Edges
//! are plain [`NodePort`] values stored on the consuming side: every node input
//! holds at most one driver, while an output may feed any number of inputs.
//! What a node does is described by its [`NodeKind`]; the simulator turns
//! kinds into behaviors.

#![warn(missing_docs)]

pub mod arena;
pub mod circuit;
pub mod clock;
pub mod connection;
pub mod error;
pub mod ids;
pub mod kind;
pub mod node;
pub mod port;

pub use arena::{Arena, ArenaId};
pub use circuit::Circuit;
pub use clock::{Clock, ClockRate, ClockSpec, ResetKind, ResetPolicy, TriggerEdge};
pub use connection::{ConnectionType, Interpretation};
pub use error::IrError;
pub use ids::{ClockId, NodeId};
pub use kind::{
    ArithOp, CompareOp, LogicOp, MemoryConfig, MemoryInput, NodeKind, ReadLatency,
    RegisterInput, RewireSource,
};
pub use node::Node;
pub use port::NodePort;
