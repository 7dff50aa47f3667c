//! Audio utility nodes with sample-accurate block processing.
//!
//! The crate provides a `Phasor` ramp generator, a trigger `Timer`, a few
//! elementwise operators and a small reference host: an explicit
//! [`Registry`], a [`GraphBuilder`] that binds ports once, and a [`Runtime`]
//! that executes nodes block by block without allocating.

pub mod buffer;
pub mod dsl;
pub mod error;
pub mod graph;
#[doc(hidden)]
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod node;
pub mod nodes;
pub mod plan;
pub mod port;
pub mod registry;
pub mod render;
pub mod rt;
pub mod settings;

pub use buffer::{PortBuffer, TriggerBuffer, TriggerError};
pub use dsl::{DslError, ExternalHandle, GraphBuilder, NodeHandle};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeSource, ExternalId, Graph, GraphError, NodeId, PortId};
pub use node::{
    check_bindings, BindError, Binding, BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass,
    NodeInfo,
};
pub use plan::{InputSource, Plan, PlanError, StaleReason};
pub use port::{PortDecl, PortDefault, PortKind, VertexInterface};
pub use registry::{NodeKey, Registry, RegistryEntry, RegistryError};
pub use rt::{NodeFault, Runtime, RuntimeError};
pub use settings::{OperatorSettings, SettingsError};
