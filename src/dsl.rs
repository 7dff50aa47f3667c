//! DSL module: name-based builder API over registry, graph and plan.

use crate::graph::{Edge, EdgeSource, ExternalId, Graph, GraphError, NodeId, PortId};
use crate::plan::{Plan, PlanError};
use crate::port::PortKind;
use crate::registry::{Registry, RegistryError, RegistryEntry};
use crate::rt::Runtime;
use crate::settings::OperatorSettings;
use std::collections::HashMap;

/// Handle to a node in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

/// Handle to a host-fed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalHandle(pub ExternalId);

/// DSL-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DslError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("no node named '{0}'")]
    MissingNode(String),
    #[error("node name '{0}' is already taken")]
    DuplicateName(String),
    #[error("node {node} has no {side} port '{port}'")]
    UnknownPort {
        node: NodeId,
        side: &'static str,
        port: String,
    },
}

/// The graph builder.
#[derive(Debug)]
pub struct GraphBuilder<'r> {
    registry: &'r Registry,
    graph: Graph,
    node_names: HashMap<String, NodeId>,
}

impl<'r> GraphBuilder<'r> {
    /// Create a builder that instantiates classes from `registry`.
    pub fn new(registry: &'r Registry, settings: OperatorSettings) -> Self {
        Self {
            registry,
            graph: Graph::new(settings),
            node_names: HashMap::new(),
        }
    }

    fn instantiate(&mut self, entry: &RegistryEntry, label: String) -> NodeHandle {
        let node = entry.create(self.graph.settings());
        NodeHandle(self.graph.add_node(label, node))
    }

    /// Add a node of `class` at its lowest registered major version.
    pub fn node(&mut self, class: &str) -> Result<NodeHandle, DslError> {
        let entry = *self.registry.get_default(class)?;
        let label = format!("{}#{}", class, self.graph.nodes().len());
        Ok(self.instantiate(&entry, label))
    }

    /// Add a node of `class` at major version `major`.
    pub fn node_versioned(&mut self, class: &str, major: u32) -> Result<NodeHandle, DslError> {
        let entry = *self.registry.get(class, major)?;
        let label = format!("{}@{}#{}", class, major, self.graph.nodes().len());
        Ok(self.instantiate(&entry, label))
    }

    /// Add a named node. Names are unique within one builder.
    pub fn node_named(&mut self, name: &str, class: &str) -> Result<NodeHandle, DslError> {
        if self.node_names.contains_key(name) {
            return Err(DslError::DuplicateName(name.to_string()));
        }
        let entry = *self.registry.get_default(class)?;
        let handle = self.instantiate(&entry, name.to_string());
        self.node_names.insert(name.to_string(), handle.0);
        Ok(handle)
    }

    /// Look up a node added with `node_named`.
    pub fn named(&self, name: &str) -> Result<NodeHandle, DslError> {
        self.node_names
            .get(name)
            .map(|&id| NodeHandle(id))
            .ok_or_else(|| DslError::MissingNode(name.to_string()))
    }

    /// Declare a host-fed input.
    pub fn external(&mut self, kind: PortKind) -> ExternalHandle {
        ExternalHandle(self.graph.add_external(kind))
    }

    fn input_port(&self, node: NodeHandle, port: &str) -> Result<(PortId, PortKind), DslError> {
        let data = self
            .graph
            .node(node.0)
            .ok_or(GraphError::InvalidNode(node.0))?;
        let interface = &data.node.describe().interface;
        interface
            .input_index(port)
            .map(|index| (PortId(index), interface.inputs[index].kind))
            .ok_or_else(|| DslError::UnknownPort {
                node: node.0,
                side: "input",
                port: port.to_string(),
            })
    }

    fn output_port(&self, node: NodeHandle, port: &str) -> Result<(PortId, PortKind), DslError> {
        let data = self
            .graph
            .node(node.0)
            .ok_or(GraphError::InvalidNode(node.0))?;
        let interface = &data.node.describe().interface;
        interface
            .output_index(port)
            .map(|index| (PortId(index), interface.outputs[index].kind))
            .ok_or_else(|| DslError::UnknownPort {
                node: node.0,
                side: "output",
                port: port.to_string(),
            })
    }

    /// Connect output `from_port` of `from` to input `to_port` of `to`.
    pub fn connect(
        &mut self,
        from: NodeHandle,
        from_port: &str,
        to: NodeHandle,
        to_port: &str,
    ) -> Result<(), DslError> {
        let (out_id, kind) = self.output_port(from, from_port)?;
        let (in_id, _) = self.input_port(to, to_port)?;
        self.graph.add_edge(Edge {
            from: EdgeSource::Node {
                node: from.0,
                port: out_id,
            },
            to_node: to.0,
            to_port: in_id,
            kind,
        })?;
        Ok(())
    }

    /// Feed a host-fed input into `to_port` of `to`.
    pub fn feed(
        &mut self,
        external: ExternalHandle,
        to: NodeHandle,
        to_port: &str,
    ) -> Result<(), DslError> {
        let (in_id, _) = self.input_port(to, to_port)?;
        let kind = self
            .graph
            .externals()
            .get(external.0 .0)
            .copied()
            .ok_or(GraphError::UnknownExternal(external.0))?;
        self.graph.add_edge(Edge {
            from: EdgeSource::External(external.0),
            to_node: to.0,
            to_port: in_id,
            kind,
        })?;
        Ok(())
    }

    /// The graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Compile the plan without building a runtime.
    pub fn compile(&self) -> Result<Plan, DslError> {
        Ok(Plan::compile(&self.graph)?)
    }

    /// Bind every port and build the runtime.
    pub fn build(self) -> Result<Runtime, DslError> {
        let plan = Plan::compile(&self.graph)?;
        Ok(Runtime::new(plan, self.graph)?)
    }
}
