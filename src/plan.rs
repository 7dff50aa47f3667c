//! Plan module: resolve every input port to the buffer that feeds it.
//!
//! Compilation walks nodes in insertion order. Each input is bound to an
//! upstream output, a host-fed external or a constant default buffer, and
//! the node checks its bindings once through `bind_ports`.

use crate::buffer::PortBuffer;
use crate::graph::{Edge, EdgeSource, ExternalId, Graph, NodeData, NodeId, PortId};
use crate::invariant_ppt::{
    assert_invariant, BINDINGS_RESOLVED, BUILD_REJECTS_UNBOUND, DEFAULTS_SUPPLIED,
};
use crate::node::{BindError, Binding};
use crate::port::PortKind;
use crate::registry::NodeKey;
use crate::settings::OperatorSettings;

/// Where an input port reads from during a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Output `port` of an earlier node.
    Upstream { node: NodeId, port: PortId },
    /// A host-fed buffer.
    External(ExternalId),
    /// Index into the plan's constant default buffers.
    Default(usize),
}

/// Errors during plan compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("node {node} ({label}) rejected its bindings: {source}")]
    Bind {
        node: NodeId,
        label: String,
        source: BindError,
    },
    #[error("input '{port}' of node {node} has neither a producer nor a default")]
    Unresolved { node: NodeId, port: &'static str },
    #[error("plan was compiled for a different graph: {0}")]
    StalePlan(StaleReason),
}

/// First difference between a plan and the graph it is paired with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaleReason {
    #[error("planned {planned} nodes, graph has {found}")]
    NodeCount { planned: usize, found: usize },
    #[error("node {node} was planned as {planned}, graph has {found}")]
    NodeClass {
        node: NodeId,
        planned: NodeKey,
        found: NodeKey,
    },
    #[error("external inputs differ")]
    Externals,
    #[error("edges differ")]
    Edges,
}

/// The compiled plan: input sources, default buffers and output layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    settings: OperatorSettings,
    execution_order: Vec<NodeId>,
    sources: Vec<Vec<InputSource>>,
    defaults: Vec<PortBuffer>,
    output_kinds: Vec<Vec<PortKind>>,
    external_kinds: Vec<PortKind>,
    classes: Vec<NodeKey>,
    edges: Vec<Edge>,
}

impl Plan {
    /// Create a plan from a graph.
    pub fn compile(graph: &Graph) -> Result<Self, PlanError> {
        let settings = *graph.settings();
        let block_size = settings.block_size();
        let mut sources = Vec::with_capacity(graph.nodes().len());
        let mut defaults = Vec::new();
        let mut output_kinds = Vec::with_capacity(graph.nodes().len());

        for data in graph.nodes() {
            let inputs = data.inputs();
            let mut bindings = Vec::with_capacity(inputs.len());
            let mut node_sources = Vec::with_capacity(inputs.len());
            let mut unresolved = None;

            for (index, decl) in inputs.iter().enumerate() {
                match graph.input_edge(data.id, PortId(index)) {
                    Some(edge) => {
                        bindings.push(Binding::Connected(edge.kind));
                        node_sources.push(match edge.from {
                            EdgeSource::Node { node, port } => InputSource::Upstream { node, port },
                            EdgeSource::External(id) => InputSource::External(id),
                        });
                    }
                    None => {
                        bindings.push(Binding::Unbound);
                        match decl.default {
                            Some(default) => {
                                node_sources.push(InputSource::Default(defaults.len()));
                                defaults.push(PortBuffer::from_default(default, block_size));
                            }
                            None => {
                                unresolved.get_or_insert(decl.name);
                            }
                        }
                    }
                }
            }

            if let Err(source) = data.node.bind_ports(&bindings) {
                if matches!(source, BindError::MissingBinding { .. }) {
                    assert_invariant(
                        BUILD_REJECTS_UNBOUND,
                        true,
                        "Unbound required input rejected",
                        Some("Plan::compile"),
                    );
                }
                tracing::warn!(node = %data.id, label = %data.label, %source, "port binding rejected");
                return Err(PlanError::Bind {
                    node: data.id,
                    label: data.label.clone(),
                    source,
                });
            }
            if let Some(port) = unresolved {
                tracing::warn!(node = %data.id, port, "input left without a source");
                return Err(PlanError::Unresolved {
                    node: data.id,
                    port,
                });
            }

            assert_invariant(
                BINDINGS_RESOLVED,
                node_sources.len() == inputs.len(),
                "Every input has exactly one source",
                Some("Plan::compile"),
            );
            sources.push(node_sources);
            output_kinds.push(data.outputs().iter().map(|decl| decl.kind).collect());
        }

        assert_invariant(
            DEFAULTS_SUPPLIED,
            sources.iter().zip(graph.nodes()).all(|(node_sources, data)| {
                node_sources.iter().zip(data.inputs()).all(|(source, decl)| match source {
                    InputSource::Default(i) => defaults.get(*i).map(PortBuffer::kind) == Some(decl.kind),
                    _ => true,
                })
            }),
            "Default buffers match their port kinds",
            Some("Plan::compile"),
        );

        tracing::debug!(
            nodes = sources.len(),
            edges = graph.edges().len(),
            defaults = defaults.len(),
            "compiled plan"
        );
        Ok(Self {
            settings,
            execution_order: (0..sources.len()).map(NodeId).collect(),
            sources,
            defaults,
            output_kinds,
            external_kinds: graph.externals().to_vec(),
            classes: graph.nodes().iter().map(node_key).collect(),
            edges: graph.edges().to_vec(),
        })
    }

    pub fn settings(&self) -> &OperatorSettings {
        &self.settings
    }

    /// Nodes in the order they execute: insertion order.
    pub fn execution_order(&self) -> &[NodeId] {
        &self.execution_order
    }

    /// Input sources of `node`, in port order.
    pub fn sources(&self, node: NodeId) -> Option<&[InputSource]> {
        self.sources.get(node.0).map(Vec::as_slice)
    }

    pub fn defaults(&self) -> &[PortBuffer] {
        &self.defaults
    }

    pub fn output_kinds(&self, node: NodeId) -> Option<&[PortKind]> {
        self.output_kinds.get(node.0).map(Vec::as_slice)
    }

    pub fn external_kinds(&self) -> &[PortKind] {
        &self.external_kinds
    }

    pub fn node_count(&self) -> usize {
        self.sources.len()
    }

    /// Fail unless `graph` is the graph this plan was compiled from: same
    /// classes in the same order, same externals and same edges.
    pub(crate) fn check_matches(&self, graph: &Graph) -> Result<(), PlanError> {
        let stale = |reason: StaleReason| -> Result<(), PlanError> {
            Err(PlanError::StalePlan(reason))
        };
        if graph.nodes().len() != self.classes.len() {
            return stale(StaleReason::NodeCount {
                planned: self.classes.len(),
                found: graph.nodes().len(),
            });
        }
        for (data, &planned) in graph.nodes().iter().zip(&self.classes) {
            let found = node_key(data);
            if found != planned {
                return stale(StaleReason::NodeClass {
                    node: data.id,
                    planned,
                    found,
                });
            }
        }
        if graph.externals() != self.external_kinds.as_slice() {
            return stale(StaleReason::Externals);
        }
        if graph.edges() != self.edges.as_slice() {
            return stale(StaleReason::Edges);
        }
        Ok(())
    }

    pub(crate) fn all_sources(&self) -> &[Vec<InputSource>] {
        &self.sources
    }
}

fn node_key(data: &NodeData) -> NodeKey {
    let info = data.node.describe();
    NodeKey {
        name: info.name,
        major: info.major_version,
    }
}
